//! Text-generation capability and its implementations.
//!
//! The classifier and handlers only see the [`TextGenerator`] trait, so tests
//! can substitute scripted replies for the network.
//!
//! - **[`GeminiGenerator`]**: calls the Gemini `generateContent` endpoint,
//!   optionally scoped to a document-search store via the `file_search` tool.
//! - **[`DisabledGenerator`]**: fails every call; used when
//!   `generation.provider = "disabled"`.
//!
//! There is no retry: one failed call is a terminal error for that request.
//! Every call is bounded by `generation.timeout_secs`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;

/// A service that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.5-flash"`).
    fn model_name(&self) -> &str;

    /// Generate a reply for `prompt`.
    ///
    /// `store` scopes the call to a document-search store; `None` means an
    /// unscoped call. `Ok(None)` means the service answered without any
    /// usable text.
    async fn generate(&self, prompt: &str, store: Option<&str>) -> Result<Option<String>>;
}

/// Build the generator named by `config.provider`.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiGenerator::new(config)?)),
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

// ============ Disabled ============

pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str, _store: Option<&str>) -> Result<Option<String>> {
        bail!("text generation is disabled")
    }
}

// ============ Gemini ============

pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key_env: String,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, store: Option<&str>) -> Result<Option<String>> {
        let api_key = std::env::var(&self.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", self.api_key_env))?;

        let body = GenerateRequest::new(prompt, store);

        tracing::debug!(model = %self.model, scoped = store.is_some(), "calling generateContent");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call generateContent endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!(
                "generateContent returned {}: {}",
                status,
                normalize_err_body(&body_text)
            );
        }

        let json: serde_json::Value = response
            .json()
            .await
            .context("failed to decode generateContent response")?;

        Ok(extract_text(&json))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Tool<'a> {
    file_search: FileSearch<'a>,
}

#[derive(Debug, Serialize)]
struct FileSearch<'a> {
    file_search_store_names: Vec<&'a str>,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, store: Option<&'a str>) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            tools: store
                .map(|s| Tool {
                    file_search: FileSearch {
                        file_search_store_names: vec![s],
                    },
                })
                .into_iter()
                .collect(),
        }
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a reply. Empty text
/// counts as no text.
fn extract_text(json: &serde_json::Value) -> Option<String> {
    json.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
}

fn normalize_err_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(msg) = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
    }

    trimmed.to_string()
}
