//! Query routing: detect the scripture, classify, dispatch to a handler.
//!
//! Handlers never fail. Not-found results, malformed data, and external
//! service faults all come back as text payloads; faults are prefixed with
//! `Error: `.

use anyhow::{bail, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

use crate::classify::QueryClassifier;
use crate::config::Config;
use crate::generation::{create_generator, TextGenerator};
use crate::lookup::{find_verse, render_lookup};
use crate::models::{QueryClassification, QueryResponse, VerseReference};
use crate::scripture::{ScriptureProfile, ScriptureRegistry};

/// Payload used when the service answers a question without text.
pub const NO_RESPONSE: &str = "No response";

/// Payload used when a search reply names no chapter and verse.
pub const VERSE_NOT_FOUND: &str = "Verse not found";

lazy_static! {
    static ref SEARCH_REPLY: Regex = Regex::new(r"(?i)Chapter (\d+),?\s*Verse (\d+)").unwrap();
}

/// Result of routing one query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub scripture: String,
    pub classification: QueryClassification,
    pub response: String,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(outcome: QueryOutcome) -> Self {
        QueryResponse {
            scripture: outcome.scripture,
            query_type: outcome.classification.query_type(),
            response: outcome.response,
        }
    }
}

/// Shared, cheaply cloneable router. Holds only read-only state.
#[derive(Clone)]
pub struct QueryRouter {
    registry: Arc<ScriptureRegistry>,
    generator: Arc<dyn TextGenerator>,
    classifier: QueryClassifier,
}

impl QueryRouter {
    pub fn new(
        registry: Arc<ScriptureRegistry>,
        generator: Arc<dyn TextGenerator>,
        classifier: QueryClassifier,
    ) -> Self {
        Self {
            registry,
            generator,
            classifier,
        }
    }

    /// Build a router from configuration with the configured generator.
    pub fn from_config(config: &Config) -> Result<Self> {
        let generator = create_generator(&config.generation)?;
        Self::with_generator(config, generator)
    }

    /// Build a router from configuration around an existing generator.
    pub fn with_generator(config: &Config, generator: Arc<dyn TextGenerator>) -> Result<Self> {
        let registry = Arc::new(ScriptureRegistry::from_config(config)?);
        let classifier = QueryClassifier::new(config.classifier.mode, generator.clone());
        Ok(Self::new(registry, generator, classifier))
    }

    pub fn registry(&self) -> &ScriptureRegistry {
        &self.registry
    }

    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }

    pub fn classifier(&self) -> &QueryClassifier {
        &self.classifier
    }

    /// Route a query end to end.
    pub async fn route(&self, query: &str) -> QueryOutcome {
        let profile = self.registry.detect(query);
        let classification = self.classifier.classify(query, profile).await;

        tracing::info!(
            scripture = %profile.id,
            query_type = %classification.query_type(),
            "routing query"
        );

        let response = match classification {
            QueryClassification::ExactReference(reference) => {
                self.handle_exact_reference(reference, profile).await
            }
            QueryClassification::VerseSearch => self.handle_verse_search(query, profile).await,
            QueryClassification::Question => self.handle_question(query, profile).await,
        };

        QueryOutcome {
            scripture: profile.name.clone(),
            classification,
            response,
        }
    }

    pub async fn handle_exact_reference(
        &self,
        reference: VerseReference,
        profile: &ScriptureProfile,
    ) -> String {
        match find_verse(profile, reference).await {
            Ok(lookup) => render_lookup(profile, reference, &lookup),
            Err(e) => {
                tracing::error!("exact reference {} failed: {:#}", reference, e);
                error_payload(&e)
            }
        }
    }

    /// Ask the service which verse the query describes, then look it up.
    pub async fn handle_verse_search(&self, query: &str, profile: &ScriptureProfile) -> String {
        let reply = match self.scoped_generate(&search_prompt(query), profile).await {
            Ok(reply) => reply.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("verse search failed: {:#}", e);
                return error_payload(&e);
            }
        };

        match parse_search_reply(&reply) {
            Some(reference) => {
                tracing::debug!("verse search identified {}", reference);
                self.handle_exact_reference(reference, profile).await
            }
            None => VERSE_NOT_FOUND.to_string(),
        }
    }

    /// Free-form answer grounded in the profile's document store.
    pub async fn handle_question(&self, query: &str, profile: &ScriptureProfile) -> String {
        match self
            .scoped_generate(&question_prompt(query, &profile.name), profile)
            .await
        {
            Ok(Some(answer)) => answer,
            Ok(None) => NO_RESPONSE.to_string(),
            Err(e) => {
                tracing::warn!("question failed: {:#}", e);
                error_payload(&e)
            }
        }
    }

    async fn scoped_generate(
        &self,
        prompt: &str,
        profile: &ScriptureProfile,
    ) -> Result<Option<String>> {
        if !profile.is_store_configured() {
            bail!("no document-search store configured for {}", profile.name);
        }
        self.generator
            .generate(prompt, Some(&profile.file_search_store))
            .await
    }
}

fn error_payload(err: &anyhow::Error) -> String {
    format!("Error: {:#}", err)
}

pub fn search_prompt(query: &str) -> String {
    format!(
        "Find this verse and respond ONLY: \"Chapter X, Verse Y\"\n\nSearch: \"{}\"",
        query
    )
}

pub fn question_prompt(query: &str, scripture: &str) -> String {
    format!(
        r#"Respond in the SAME language as the question.

Question: "{query}"

Provide guidance from {scripture}. Format the answer in markdown with these sections:

## Overview
A short, direct answer.

## Key Verses
For each relevant verse:
- **Reference:** Chapter X, Verse Y
- **Sanskrit:** the original verse
- **Meaning:** a plain translation
- **Relevance:** how it answers the question

## Deeper Understanding
Context and interpretation from the commentaries."#
    )
}

/// Pull `Chapter X, Verse Y` out of a search reply.
pub fn parse_search_reply(reply: &str) -> Option<VerseReference> {
    let caps = SEARCH_REPLY.captures(reply)?;
    VerseReference::parse(&caps[1], &caps[2])
}
