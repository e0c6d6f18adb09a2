//! Core data models shared by the classifier, handlers, parser, and server.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chapter/verse pair. Values are taken as written: zero or negative
/// numbers are not rejected here, they simply never match a stored verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerseReference {
    pub chapter: i64,
    pub verse: i64,
}

impl VerseReference {
    pub fn new(chapter: i64, verse: i64) -> Self {
        Self { chapter, verse }
    }

    /// Parse captured chapter and verse numbers. A digit string too large
    /// for `i64` saturates to `i64::MAX`, so it stays a reference and later
    /// fails lookup as not found.
    pub fn parse(chapter: &str, verse: &str) -> Option<Self> {
        Some(Self::new(parse_number(chapter)?, parse_number(verse)?))
    }
}

fn parse_number(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse().ok().or_else(|| {
        (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())).then_some(i64::MAX)
    })
}

impl fmt::Display for VerseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.chapter, self.verse)
    }
}

/// A translator's or commentator's text, keyed by author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthoredText {
    pub author: String,
    pub text: String,
}

impl AuthoredText {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }
}

/// One verse entry of a chapter file.
///
/// `translations` and `commentaries` are JSON objects on disk; they are kept
/// as ordered lists so rendering follows the file's key order.
#[derive(Debug, Clone, Deserialize)]
pub struct VerseRecord {
    pub verse: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "authored_entries")]
    pub translations: Vec<AuthoredText>,
    #[serde(default, deserialize_with = "authored_entries")]
    pub commentaries: Vec<AuthoredText>,
}

/// Deserialize a JSON object into `(author, text)` pairs in document order.
/// `null` yields an empty list; non-string values are kept as their JSON text.
fn authored_entries<'de, D>(deserializer: D) -> Result<Vec<AuthoredText>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<AuthoredText>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an object mapping author names to text")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((author, value)) = map.next_entry::<String, serde_json::Value>()? {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                entries.push(AuthoredText { author, text });
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_any(EntriesVisitor)
}

/// The query type tag reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryType {
    ExactReference,
    VerseSearch,
    Question,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::ExactReference => "EXACT_REFERENCE",
            QueryType::VerseSearch => "VERSE_SEARCH",
            QueryType::Question => "QUESTION",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which handler a query goes to. Produced fresh for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryClassification {
    ExactReference(VerseReference),
    VerseSearch,
    Question,
}

impl QueryClassification {
    pub fn query_type(&self) -> QueryType {
        match self {
            QueryClassification::ExactReference(_) => QueryType::ExactReference,
            QueryClassification::VerseSearch => QueryType::VerseSearch,
            QueryClassification::Question => QueryType::Question,
        }
    }
}

impl fmt::Display for QueryClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryClassification::ExactReference(r) => {
                write!(f, "EXACT_REFERENCE chapter={} verse={}", r.chapter, r.verse)
            }
            other => f.write_str(other.query_type().as_str()),
        }
    }
}

/// `POST /api/orchestrator` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// `POST /api/orchestrator` response body.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub scripture: String,
    #[serde(rename = "queryType")]
    pub query_type: QueryType,
    pub response: String,
}

/// Structured sections recovered from a handler's text payload.
///
/// `general` is populated exactly when neither `verse_info` nor `sanskrit`
/// was found; it then holds the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormattedResponse {
    #[serde(rename = "verseInfo", skip_serializing_if = "Option::is_none")]
    pub verse_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanskrit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transliteration: Option<String>,
    #[serde(rename = "wordMeanings", skip_serializing_if = "Option::is_none")]
    pub word_meanings: Option<String>,
    pub translations: Vec<AuthoredText>,
    pub commentaries: Vec<AuthoredText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general: Option<String>,
}

impl FormattedResponse {
    pub fn is_structured(&self) -> bool {
        self.general.is_none()
    }
}
