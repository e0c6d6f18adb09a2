use serde::Serialize;

use crate::scripture::ScriptureRegistry;

/// Health of one configured scripture profile.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub id: String,
    pub name: String,
    pub data_dir: String,
    pub data_dir_exists: bool,
    pub chapter_files: usize,
    pub store_configured: bool,
    pub is_default: bool,
}

/// Inspect every profile's data directory and store configuration.
pub fn get_sources(registry: &ScriptureRegistry) -> Vec<SourceStatus> {
    let default_id = &registry.default_profile().id;

    registry
        .profiles()
        .iter()
        .map(|p| {
            let chapter_files = count_chapter_files(&p.data_dir, &p.file_pattern);
            SourceStatus {
                id: p.id.clone(),
                name: p.name.clone(),
                data_dir: p.data_dir.display().to_string(),
                data_dir_exists: p.data_dir.is_dir(),
                chapter_files,
                store_configured: p.is_store_configured(),
                is_default: &p.id == default_id,
            }
        })
        .collect()
}

/// Files in `dir` whose names fit `pattern` around its `{num}` placeholder.
fn count_chapter_files(dir: &std::path::Path, pattern: &str) -> usize {
    let (prefix, suffix) = pattern.split_once("{num}").unwrap_or((pattern, ""));

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.len() > prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
                && name[prefix.len()..name.len() - suffix.len()]
                    .chars()
                    .all(|c| c.is_ascii_digit())
        })
        .count()
}

pub fn list_sources(registry: &ScriptureRegistry) {
    println!(
        "{:<16} {:<16} {:<10} {:<9} STORE",
        "SCRIPTURE", "NAME", "DATA", "CHAPTERS"
    );
    for s in get_sources(registry) {
        let data = if s.data_dir_exists { "OK" } else { "MISSING" };
        let store = if s.store_configured {
            "configured"
        } else {
            "NOT CONFIGURED"
        };
        let marker = if s.is_default { " (default)" } else { "" };
        println!(
            "{:<16} {:<16} {:<10} {:<9} {}{}",
            s.id, s.name, data, s.chapter_files, store, marker
        );
    }
}
