//! Query classification.
//!
//! Every query first goes through the fast path: a bare `<int>[.:]<int>` or
//! any of the profile's reference patterns is an exact reference, and no
//! external call is made. What remains is decided by the configured
//! [`ClassifierMode`]:
//!
//! - **Local**: a trailing or embedded `?`, or a leading interrogative
//!   word, means a question; anything else is a verse search.
//! - **Llm**: the text-generation service picks one of the three types.
//!   If the call fails the local question heuristic decides instead, so
//!   classification never fails.

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

use crate::config::ClassifierMode;
use crate::generation::TextGenerator;
use crate::models::{QueryClassification, VerseReference};
use crate::scripture::ScriptureProfile;

lazy_static! {
    /// Bare `chapter.verse` or `chapter:verse`.
    static ref BARE_REFERENCE: Regex = Regex::new(r"^([0-9]+)[.:]([0-9]+)$").unwrap();

    static ref REPLY_CHAPTER: Regex = Regex::new(r"(?i)chapter\s*=\s*(-?[0-9]+)").unwrap();
    static ref REPLY_VERSE: Regex = Regex::new(r"(?i)verse\s*=\s*(-?[0-9]+)").unwrap();
}

/// Leading words that mark a question (English and Hindi).
pub const QUESTION_WORDS: &[&str] = &[
    "what", "why", "how", "when", "who", "should", "can", "could", "क्या", "कैसे", "क्यों",
];

/// The `<int>[.:]<int>` shortcut. No range checks; oversized numbers
/// saturate instead of falling off the fast path.
pub fn bare_reference(query: &str) -> Option<VerseReference> {
    let caps = BARE_REFERENCE.captures(query.trim())?;
    VerseReference::parse(&caps[1], &caps[2])
}

/// Exact references recognised without any external call.
pub fn fast_path(query: &str, profile: &ScriptureProfile) -> Option<VerseReference> {
    bare_reference(query).or_else(|| profile.parse_reference(query.trim()))
}

pub fn looks_like_question(query: &str) -> bool {
    if query.contains('?') {
        return true;
    }
    let lowered = query.trim().to_lowercase();
    QUESTION_WORDS.iter().any(|w| lowered.starts_with(w))
}

/// Classification without network access.
pub fn classify_local(query: &str, profile: &ScriptureProfile) -> QueryClassification {
    if let Some(reference) = fast_path(query, profile) {
        return QueryClassification::ExactReference(reference);
    }
    heuristic(query)
}

fn heuristic(query: &str) -> QueryClassification {
    if looks_like_question(query) {
        QueryClassification::Question
    } else {
        QueryClassification::VerseSearch
    }
}

pub fn classification_prompt(query: &str) -> String {
    format!(
        r#"Classify the following query about a scripture into exactly one category.

EXACT_REFERENCE - the query names a specific chapter and verse number.
VERSE_SEARCH - the query quotes or describes a verse and wants to find it.
QUESTION - the query asks for guidance, explanation, or meaning.

Reply with ONLY one of these lines:
EXACT_REFERENCE: chapter=N, verse=M
VERSE_SEARCH
QUESTION

Query: "{}""#,
        query
    )
}

/// Read the service's reply. EXACT_REFERENCE wins only when both numbers
/// parse; then QUESTION; anything else is a verse search.
pub fn parse_classification_reply(reply: &str) -> QueryClassification {
    let upper = reply.to_uppercase();

    if upper.contains("EXACT_REFERENCE") {
        let chapter = REPLY_CHAPTER
            .captures(reply)
            .and_then(|c| c[1].parse().ok());
        let verse = REPLY_VERSE.captures(reply).and_then(|c| c[1].parse().ok());
        if let (Some(chapter), Some(verse)) = (chapter, verse) {
            return QueryClassification::ExactReference(VerseReference::new(chapter, verse));
        }
    }

    if upper.contains("QUESTION") {
        return QueryClassification::Question;
    }

    QueryClassification::VerseSearch
}

/// Classifier bound to a strategy and, for [`ClassifierMode::Llm`], a
/// generator.
#[derive(Clone)]
pub struct QueryClassifier {
    mode: ClassifierMode,
    generator: Arc<dyn TextGenerator>,
}

impl QueryClassifier {
    pub fn new(mode: ClassifierMode, generator: Arc<dyn TextGenerator>) -> Self {
        Self { mode, generator }
    }

    pub fn mode(&self) -> ClassifierMode {
        self.mode
    }

    pub async fn classify(&self, query: &str, profile: &ScriptureProfile) -> QueryClassification {
        if let Some(reference) = fast_path(query, profile) {
            return QueryClassification::ExactReference(reference);
        }

        match self.mode {
            ClassifierMode::Local => heuristic(query),
            ClassifierMode::Llm => {
                match self.generator.generate(&classification_prompt(query), None).await {
                    Ok(Some(reply)) => parse_classification_reply(&reply),
                    Ok(None) => QueryClassification::VerseSearch,
                    Err(e) => {
                        tracing::warn!("classification call failed, using heuristic: {:#}", e);
                        heuristic(query)
                    }
                }
            }
        }
    }
}
