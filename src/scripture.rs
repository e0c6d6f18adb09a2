//! Scripture profiles and the registry that holds them.
//!
//! A [`ScriptureRegistry`] is built once from [`Config`] and handed to the
//! router; nothing here is global. Profiles are consulted in id order, and
//! the first one to match wins.

use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::PathBuf;

use crate::config::{Config, ProfileConfig};
use crate::models::VerseReference;

/// A compiled, read-only scripture profile.
#[derive(Debug, Clone)]
pub struct ScriptureProfile {
    pub id: String,
    /// Display name used in responses and verse headers.
    pub name: String,
    pub file_search_store: String,
    pub data_dir: PathBuf,
    pub file_pattern: String,
    pub collection_key: String,
    keyword_pattern: Option<Regex>,
    reference_patterns: Vec<Regex>,
}

impl ScriptureProfile {
    pub fn from_config(id: &str, cfg: &ProfileConfig) -> Result<Self> {
        let keyword_pattern = if cfg.keywords.is_empty() {
            None
        } else {
            let alternation = cfg
                .keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"(?i)\b({})\b", alternation);
            Some(
                Regex::new(&pattern)
                    .with_context(|| format!("invalid keywords for scripture '{}'", id))?,
            )
        };

        let reference_patterns = cfg
            .reference_patterns
            .iter()
            .map(|p| {
                let re = Regex::new(p).with_context(|| {
                    format!("invalid reference pattern for scripture '{}': {}", id, p)
                })?;
                if re.captures_len() < 3 {
                    bail!(
                        "reference pattern for scripture '{}' needs chapter and verse groups: {}",
                        id,
                        p
                    );
                }
                Ok(re)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: id.to_string(),
            name: cfg.name.clone(),
            file_search_store: cfg.file_search_store.clone(),
            data_dir: cfg.data_dir.clone(),
            file_pattern: cfg.file_pattern.clone(),
            collection_key: cfg.collection_key.clone(),
            keyword_pattern,
            reference_patterns,
        })
    }

    /// Whether the query names this scripture (e.g. "gita", "arjuna").
    pub fn is_mentioned_in(&self, query: &str) -> bool {
        self.keyword_pattern
            .as_ref()
            .is_some_and(|re| re.is_match(query))
    }

    pub fn matches_reference(&self, query: &str) -> bool {
        self.reference_patterns.iter().any(|re| re.is_match(query))
    }

    /// First reference pattern whose chapter and verse groups both parse.
    pub fn parse_reference(&self, query: &str) -> Option<VerseReference> {
        self.reference_patterns.iter().find_map(|re| {
            let caps = re.captures(query)?;
            VerseReference::parse(caps.get(1)?.as_str(), caps.get(2)?.as_str())
        })
    }

    pub fn chapter_file_name(&self, chapter: i64) -> String {
        self.file_pattern.replace("{num}", &chapter.to_string())
    }

    pub fn chapter_path(&self, chapter: i64) -> PathBuf {
        self.data_dir.join(self.chapter_file_name(chapter))
    }

    /// Profiles without a document-search store are placeholders: exact
    /// lookups work, AI-backed search and questions do not.
    pub fn is_store_configured(&self) -> bool {
        !self.file_search_store.trim().is_empty()
    }
}

/// All configured profiles plus the default one.
#[derive(Debug, Clone)]
pub struct ScriptureRegistry {
    profiles: Vec<ScriptureProfile>,
    default_index: usize,
}

impl ScriptureRegistry {
    pub fn from_config(config: &Config) -> Result<Self> {
        let profiles = config
            .scriptures
            .profiles
            .iter()
            .map(|(id, cfg)| ScriptureProfile::from_config(id, cfg))
            .collect::<Result<Vec<_>>>()?;

        Self::new(profiles, &config.scriptures.default)
    }

    pub fn new(profiles: Vec<ScriptureProfile>, default_id: &str) -> Result<Self> {
        if profiles.is_empty() {
            bail!("scripture registry must contain at least one profile");
        }
        let default_index = profiles
            .iter()
            .position(|p| p.id == default_id)
            .ok_or_else(|| anyhow::anyhow!("default scripture not found: {}", default_id))?;

        Ok(Self {
            profiles,
            default_index,
        })
    }

    pub fn default_profile(&self) -> &ScriptureProfile {
        &self.profiles[self.default_index]
    }

    pub fn get(&self, id: &str) -> Option<&ScriptureProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn profiles(&self) -> &[ScriptureProfile] {
        &self.profiles
    }

    /// Store ids of every profile that has one.
    pub fn active_stores(&self) -> Vec<&str> {
        self.profiles
            .iter()
            .filter(|p| p.is_store_configured())
            .map(|p| p.file_search_store.as_str())
            .collect()
    }

    /// Pick the scripture a query is about: an explicit name mention first,
    /// then any profile whose reference patterns match, else the default.
    pub fn detect(&self, query: &str) -> &ScriptureProfile {
        self.profiles
            .iter()
            .find(|p| p.is_mentioned_in(query))
            .or_else(|| self.profiles.iter().find(|p| p.matches_reference(query)))
            .unwrap_or_else(|| self.default_profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gita() -> ScriptureProfile {
        ScriptureProfile::from_config("bhagavad-gita", &ProfileConfig::bhagavad_gita()).unwrap()
    }

    fn placeholder(id: &str, keywords: &[&str], patterns: &[&str]) -> ScriptureProfile {
        let cfg = ProfileConfig {
            name: id.to_uppercase(),
            file_search_store: String::new(),
            data_dir: PathBuf::from("data").join(id),
            file_pattern: format!("{}_{{num}}.json", id),
            collection_key: "Chapter".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            reference_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        };
        ScriptureProfile::from_config(id, &cfg).unwrap()
    }

    #[test]
    fn test_parse_reference_variants() {
        let p = gita();
        assert_eq!(p.parse_reference("2.47"), Some(VerseReference::new(2, 47)));
        assert_eq!(p.parse_reference("18:66"), Some(VerseReference::new(18, 66)));
        assert_eq!(p.parse_reference("BG 3.16"), Some(VerseReference::new(3, 16)));
        assert_eq!(p.parse_reference("gita4:7"), Some(VerseReference::new(4, 7)));
        assert_eq!(
            p.parse_reference("show me Chapter 12 verse 13 please"),
            Some(VerseReference::new(12, 13))
        );
        assert_eq!(p.parse_reference("what is dharma?"), None);
    }

    #[test]
    fn test_parse_reference_oversized_chapter_saturates() {
        let p = gita();
        assert_eq!(
            p.parse_reference("BG 99999999999999999999.1"),
            Some(VerseReference::new(i64::MAX, 1))
        );
    }

    #[test]
    fn test_chapter_file_name() {
        let p = gita();
        assert_eq!(p.chapter_file_name(2), "bhagavad_gita_chapter_2.json");
        assert_eq!(
            p.chapter_path(18),
            PathBuf::from("data/bhagavad-gita/bhagavad_gita_chapter_18.json")
        );
    }

    #[test]
    fn test_keyword_mention_is_word_bounded() {
        let p = gita();
        assert!(p.is_mentioned_in("What did Krishna tell Arjuna?"));
        assert!(p.is_mentioned_in("GITA on duty"));
        // "bg" inside another word must not count
        assert!(!p.is_mentioned_in("a bgp route"));
    }

    #[test]
    fn test_rejects_pattern_without_groups() {
        let mut cfg = ProfileConfig::bhagavad_gita();
        cfg.reference_patterns = vec![r"^\d+$".to_string()];
        let err = ScriptureProfile::from_config("g", &cfg).unwrap_err();
        assert!(err.to_string().contains("chapter and verse groups"));
    }

    #[test]
    fn test_rejects_invalid_regex() {
        let mut cfg = ProfileConfig::bhagavad_gita();
        cfg.reference_patterns = vec!["(".to_string()];
        assert!(ScriptureProfile::from_config("g", &cfg).is_err());
    }

    #[test]
    fn test_detect_prefers_mention_then_pattern_then_default() {
        let registry = ScriptureRegistry::new(
            vec![
                gita(),
                placeholder("ramayana", &["rama", "sita"], &[r"(?i)^kanda\s*(\d+)\.(\d+)"]),
            ],
            "bhagavad-gita",
        )
        .unwrap();

        assert_eq!(registry.detect("Why did Rama go to the forest").id, "ramayana");
        assert_eq!(registry.detect("kanda 2.14").id, "ramayana");
        assert_eq!(registry.detect("2.47").id, "bhagavad-gita");
        assert_eq!(registry.detect("meaning of life").id, "bhagavad-gita");
    }

    #[test]
    fn test_active_stores_skips_placeholders() {
        let registry = ScriptureRegistry::new(
            vec![gita(), placeholder("ramayana", &[], &[])],
            "bhagavad-gita",
        )
        .unwrap();
        assert_eq!(
            registry.active_stores(),
            vec![crate::config::GITA_FILE_SEARCH_STORE]
        );
        assert!(!registry.get("ramayana").unwrap().is_store_configured());
    }

    #[test]
    fn test_unknown_default_rejected() {
        assert!(ScriptureRegistry::new(vec![gita()], "quran").is_err());
        assert!(ScriptureRegistry::new(vec![], "bhagavad-gita").is_err());
    }

    #[test]
    fn test_from_config() {
        let registry = ScriptureRegistry::from_config(&Config::minimal()).unwrap();
        assert_eq!(registry.profiles().len(), 1);
        assert_eq!(registry.default_profile().name, "Bhagavad Gita");
    }
}
