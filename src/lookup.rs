//! Exact verse lookup from per-chapter JSON files.
//!
//! Each chapter lives in its own file under the profile's `data_dir`,
//! named by substituting the chapter number into `file_pattern`:
//!
//! ```json
//! { "BhagavadGitaChapter": [
//!     { "verse": 47, "text": "...", "translations": { "Author": "..." },
//!       "commentaries": { "Author": "..." } }
//! ] }
//! ```
//!
//! Files are re-read on every lookup; there is no cache.

use anyhow::{Context, Result};
use std::fmt::Write;

use crate::models::{AuthoredText, VerseRecord, VerseReference};
use crate::scripture::ScriptureProfile;

/// Expected outcomes of a lookup. I/O and JSON faults are errors instead.
#[derive(Debug, Clone)]
pub enum VerseLookup {
    Found(VerseRecord),
    FileMissing { file_name: String },
    InvalidStructure { file_name: String },
    VerseMissing(VerseReference),
}

pub async fn find_verse(
    profile: &ScriptureProfile,
    reference: VerseReference,
) -> Result<VerseLookup> {
    let file_name = profile.chapter_file_name(reference.chapter);
    let path = profile.chapter_path(reference.chapter);

    let exists = tokio::fs::try_exists(&path)
        .await
        .with_context(|| format!("failed to stat {}", path.display()))?;
    if !exists {
        return Ok(VerseLookup::FileMissing { file_name });
    }

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let chapter: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", file_name))?;

    let verses = match chapter
        .get(&profile.collection_key)
        .and_then(|v| v.as_array())
    {
        Some(verses) => verses,
        None => return Ok(VerseLookup::InvalidStructure { file_name }),
    };

    let entry = verses
        .iter()
        .find(|v| v.get("verse").and_then(|n| n.as_i64()) == Some(reference.verse));

    match entry {
        Some(entry) => {
            let record: VerseRecord = serde_json::from_value(entry.clone()).with_context(|| {
                format!("malformed verse {} in {}", reference, file_name)
            })?;
            Ok(VerseLookup::Found(record))
        }
        None => Ok(VerseLookup::VerseMissing(reference)),
    }
}

/// Text payload for a lookup outcome.
pub fn render_lookup(
    profile: &ScriptureProfile,
    reference: VerseReference,
    lookup: &VerseLookup,
) -> String {
    match lookup {
        VerseLookup::Found(record) => render_verse(profile, reference, record),
        VerseLookup::FileMissing { file_name } => format!("File not found: {}", file_name),
        VerseLookup::InvalidStructure { file_name } => {
            format!("Invalid JSON structure in {}", file_name)
        }
        VerseLookup::VerseMissing(r) => format!("Verse {}.{} not found", r.chapter, r.verse),
    }
}

/// Markdown block for a verse: bold header, source text, then every
/// translation and commentary in file order.
pub fn render_verse(
    profile: &ScriptureProfile,
    reference: VerseReference,
    record: &VerseRecord,
) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "**{}, Chapter {}, Verse {}**\n\n",
        profile.name, reference.chapter, reference.verse
    );
    let _ = write!(out, "**Sanskrit:**\n{}\n\n", record.text);

    write_authored_section(&mut out, "Translations", &record.translations);
    write_authored_section(&mut out, "Commentaries", &record.commentaries);

    out
}

fn write_authored_section(out: &mut String, title: &str, entries: &[AuthoredText]) {
    if entries.is_empty() {
        return;
    }
    let _ = write!(out, "**{}:**\n\n", title);
    for entry in entries {
        let _ = write!(out, "**{}:**\n{}\n\n", entry.author, entry.text);
    }
}
