//! Response parsing and terminal rendering.
//!
//! [`parse_response`] recovers the sections of a verse payload (header,
//! Sanskrit, transliteration, word meanings, translations, commentaries).
//! Anything without a verse header or Sanskrit block is treated as general
//! prose. Parsing is purely pattern-based and never fails; missing sections
//! are simply absent.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Write;

use crate::models::{AuthoredText, FormattedResponse};

lazy_static! {
    static ref VERSE_INFO: Regex = Regex::new(r"\*\*([^*]+Chapter \d+, Verse \d+)\*\*").unwrap();
    static ref AUTHORED_ENTRY: Regex = Regex::new(r"(?s)\*\*([^*]+):\*\*\n(.+)").unwrap();
    static ref VERSE_NUMBER_SUFFIX: Regex = Regex::new(r"\s*(?:।।)?\s*[0-9.]+\s*।।\s*$").unwrap();
}

const SECTION_BREAK: &str = "\n\n**";
/// "uvāca" (said), standalone and joined to the preceding name.
const SPEAKER_MARKERS: &[&str] = &["उवाच", "ुवाच"];

/// Length of a commentary preview in the terminal view.
pub const PREVIEW_CHARS: usize = 200;

pub fn parse_response(raw: &str) -> FormattedResponse {
    let mut sections = FormattedResponse {
        verse_info: VERSE_INFO.captures(raw).map(|c| c[1].to_string()),
        sanskrit: labelled_block(raw, "Sanskrit"),
        transliteration: labelled_block(raw, "Transliteration"),
        word_meanings: labelled_block(raw, "Word Meanings"),
        ..Default::default()
    };

    let translations_label = "**Translations:**\n\n";
    if let Some(start) = raw.find(translations_label) {
        let rest = &raw[start + translations_label.len()..];
        let end = rest.find("\n\n**Commentaries:").unwrap_or(rest.len());
        sections.translations = authored_entries(&rest[..end]);
    }

    let commentaries_label = "**Commentaries:**\n\n";
    if let Some(start) = raw.find(commentaries_label) {
        sections.commentaries = authored_entries(&raw[start + commentaries_label.len()..]);
    }

    if sections.verse_info.is_none() && sections.sanskrit.is_none() {
        sections.general = Some(raw.to_string());
    }

    sections
}

/// Text after `**<label>:**\n` up to the next bold section or the end.
/// The block may not contain `*`; an empty block counts as absent.
fn labelled_block(raw: &str, label: &str) -> Option<String> {
    let marker = format!("**{}:**\n", label);
    raw.match_indices(&marker).find_map(|(start, _)| {
        let rest = &raw[start + marker.len()..];
        let body = &rest[..rest.find(SECTION_BREAK).unwrap_or(rest.len())];
        if body.is_empty() || body.contains('*') {
            return None;
        }
        let trimmed = body.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Split a block on blank lines that precede `**` and read each
/// `**Author:**\ntext` entry. Entries that do not fit are skipped.
fn authored_entries(block: &str) -> Vec<AuthoredText> {
    if block.is_empty() {
        return Vec::new();
    }
    split_before_bold(block)
        .into_iter()
        .filter_map(|entry| {
            let caps = AUTHORED_ENTRY.captures(entry)?;
            Some(AuthoredText::new(caps[1].trim(), caps[2].trim()))
        })
        .collect()
}

fn split_before_bold(block: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut last = 0;
    let mut search_from = 0;
    while let Some(pos) = block[search_from..].find(SECTION_BREAK) {
        let at = search_from + pos;
        parts.push(&block[last..at]);
        last = at + 2;
        search_from = last;
    }
    parts.push(&block[last..]);
    parts
}

/// A Sanskrit verse split for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanskritBlock {
    /// Speaker line such as "अर्जुन उवाच", when the verse opens with one.
    pub speaker: Option<String>,
    pub lines: Vec<String>,
}

/// Strip the trailing `।।2.47।।`-style number, split on blank lines, and
/// lift an opening "... उवाच" part out as the speaker.
pub fn split_sanskrit(text: &str) -> SanskritBlock {
    let cleaned = VERSE_NUMBER_SUFFIX.replace(text, "");
    let mut parts: Vec<String> = cleaned
        .trim()
        .split("\n\n")
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect();

    let speaker = match parts.first() {
        Some(first) if SPEAKER_MARKERS.iter().any(|m| first.contains(m)) => {
            Some(parts.remove(0))
        }
        _ => None,
    };

    SanskritBlock {
        speaker,
        lines: parts,
    }
}

/// First `limit` characters followed by `...`, or the whole text if short.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Plain-text view of a parsed response. Commentaries are previewed
/// unless `full` is set.
pub fn render_terminal(sections: &FormattedResponse, full: bool) -> String {
    let mut out = String::new();

    if let Some(general) = &sections.general {
        out.push_str(general.trim_end());
        out.push('\n');
        return out;
    }

    if let Some(info) = &sections.verse_info {
        let _ = writeln!(out, "=== {} ===\n", info);
    }

    if let Some(sanskrit) = &sections.sanskrit {
        let block = split_sanskrit(sanskrit);
        out.push_str("--- Sanskrit ---\n");
        if let Some(speaker) = &block.speaker {
            let _ = writeln!(out, "{}:", speaker);
        }
        for line in &block.lines {
            let _ = writeln!(out, "  {}", line);
        }
        out.push('\n');
    }

    if let Some(t) = &sections.transliteration {
        let _ = writeln!(out, "--- Transliteration ---\n{}\n", t);
    }

    if let Some(m) = &sections.word_meanings {
        let _ = writeln!(out, "--- Word Meanings ---\n{}\n", m);
    }

    if !sections.translations.is_empty() {
        let _ = writeln!(out, "--- Translations ({}) ---", sections.translations.len());
        for t in &sections.translations {
            let _ = writeln!(out, "[{}]\n{}\n", t.author, t.text);
        }
    }

    if !sections.commentaries.is_empty() {
        let _ = writeln!(out, "--- Commentaries ({}) ---", sections.commentaries.len());
        for c in &sections.commentaries {
            let text = if full {
                c.text.clone()
            } else {
                preview(&c.text, PREVIEW_CHARS)
            };
            let _ = writeln!(out, "[{}]\n{}\n", c.author, text);
        }
    }

    out
}
