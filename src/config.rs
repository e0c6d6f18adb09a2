//! TOML configuration.
//!
//! A single file describes the HTTP bind address, the external
//! text-generation service, the classifier strategy, and the scripture
//! profiles. Every section has defaults, so [`Config::minimal`] (Bhagavad
//! Gita profile, Gemini generation, local classifier) is what an empty file
//! parses to and what commands fall back to when no file exists.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default document-search store holding the indexed Gita corpus.
pub const GITA_FILE_SEARCH_STORE: &str = "fileSearchStores/bhagavadgitacomplete-1jvvdhtbnqja";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub scriptures: ScripturesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Name of the environment variable holding the API key. The key itself
    /// is read on every call, so a missing key fails requests, not startup.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Which strategy decides the query type for inputs the fast path misses.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    /// Reference patterns and question words, no network.
    #[default]
    Local,
    /// Ask the text-generation service, falling back to question words.
    Llm,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub mode: ClassifierMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScripturesConfig {
    #[serde(default = "default_scripture")]
    pub default: String,
    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl Default for ScripturesConfig {
    fn default() -> Self {
        Self {
            default: default_scripture(),
            profiles: default_profiles(),
        }
    }
}

fn default_scripture() -> String {
    "bhagavad-gita".to_string()
}

fn default_profiles() -> BTreeMap<String, ProfileConfig> {
    let mut profiles = BTreeMap::new();
    profiles.insert(default_scripture(), ProfileConfig::bhagavad_gita());
    profiles
}

/// One scripture profile as written in TOML. Compiled into a
/// [`crate::scripture::ScriptureProfile`] by the registry.
#[derive(Debug, Deserialize, Clone)]
pub struct ProfileConfig {
    pub name: String,
    /// Document-search store id. Empty means the profile is a placeholder
    /// and AI-backed handlers are unavailable for it.
    #[serde(default)]
    pub file_search_store: String,
    pub data_dir: PathBuf,
    /// Chapter filename template; `{num}` is replaced by the chapter number.
    pub file_pattern: String,
    /// Top-level key of the verse array inside each chapter file.
    #[serde(default = "default_collection_key")]
    pub collection_key: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub reference_patterns: Vec<String>,
}

fn default_collection_key() -> String {
    "BhagavadGitaChapter".to_string()
}

impl ProfileConfig {
    pub fn bhagavad_gita() -> Self {
        Self {
            name: "Bhagavad Gita".to_string(),
            file_search_store: GITA_FILE_SEARCH_STORE.to_string(),
            data_dir: PathBuf::from("data/bhagavad-gita"),
            file_pattern: "bhagavad_gita_chapter_{num}.json".to_string(),
            collection_key: default_collection_key(),
            keywords: ["gita", "bg", "bhagavad", "krishna", "arjuna"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            reference_patterns: [
                r"^(\d+)\.(\d+)$",
                r"^(\d+):(\d+)$",
                r"(?i)^bg\s*(\d+)[:.](\d+)",
                r"(?i)^gita\s*(\d+)[:.](\d+)",
                r"(?i)chapter\s*(\d+)\s*verse\s*(\d+)",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
        }
    }
}

impl Config {
    /// Configuration used when no file is present: built-in defaults only.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig::default(),
            generation: GenerationConfig::default(),
            classifier: ClassifierConfig::default(),
            scriptures: ScripturesConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    match config.generation.provider.as_str() {
        "disabled" | "gemini" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be disabled or gemini.",
            other
        ),
    }

    if config.generation.timeout_secs == 0 {
        bail!("generation.timeout_secs must be > 0");
    }

    if config.generation.is_enabled() && config.generation.model.trim().is_empty() {
        bail!("generation.model must be set when provider is '{}'", config.generation.provider);
    }

    if config.scriptures.profiles.is_empty() {
        bail!("at least one [scriptures.profiles.<id>] entry is required");
    }

    if !config
        .scriptures
        .profiles
        .contains_key(&config.scriptures.default)
    {
        bail!(
            "scriptures.default '{}' does not name a configured profile",
            config.scriptures.default
        );
    }

    for (id, profile) in &config.scriptures.profiles {
        if !profile.file_pattern.contains("{num}") {
            bail!(
                "scriptures.profiles.{}.file_pattern must contain '{{num}}'",
                id
            );
        }
        if profile.collection_key.trim().is_empty() {
            bail!("scriptures.profiles.{}.collection_key must not be empty", id);
        }
    }

    Ok(())
}
