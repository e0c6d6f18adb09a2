//! HTTP-level tests: the API server with an injected generator, and the
//! Gemini client against a local stub of `generateContent`.

use anyhow::Result;
use async_trait::async_trait;
use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use dharma::config::{Config, GenerationConfig};
use dharma::generation::{GeminiGenerator, TextGenerator};
use dharma::server::run_server_with_generator;

// ─── Helpers ────────────────────────────────────────────────────────

/// Replies from a queue; an `Err` entry simulates a failed call.
struct QueuedGenerator {
    replies: Mutex<Vec<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl QueuedGenerator {
    fn new(replies: Vec<std::result::Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for QueuedGenerator {
    fn model_name(&self) -> &str {
        "queued"
    }

    async fn generate(&self, prompt: &str, _store: Option<&str>) -> Result<Option<String>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok(None);
        }
        match replies.remove(0) {
            Ok(text) => Ok(Some(text)),
            Err(msg) => Err(anyhow::anyhow!(msg)),
        }
    }
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn write_gita_data(tmp: &TempDir) {
    fs::write(
        tmp.path().join("bhagavad_gita_chapter_2.json"),
        r#"{ "BhagavadGitaChapter": [
            { "verse": 20, "text": "न जायते म्रियते वा कदाचिन्",
              "translations": { "Swami Sivananda": "He is not born, nor does He ever die." },
              "commentaries": { "Sri Shankaracharya": "The Self is not born." } },
            { "verse": 47, "text": "कर्मण्येवाधिकारस्ते",
              "translations": { "Swami Sivananda": "Thy right is to work only.",
                                "Swami Gambirananda": "Your right is for action alone." },
              "commentaries": {} }
        ] }"#,
    )
    .unwrap();
}

/// Start the server on a free port with `generator`. Returns the base URL.
async fn start_server(
    tmp: &TempDir,
    generator: Arc<QueuedGenerator>,
) -> (String, tokio::task::JoinHandle<()>) {
    write_gita_data(tmp);
    let port = find_free_port();

    let mut config = Config::minimal();
    config.server.bind = format!("127.0.0.1:{}", port);
    config
        .scriptures
        .profiles
        .get_mut("bhagavad-gita")
        .unwrap()
        .data_dir = tmp.path().to_path_buf();

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server_with_generator(&config, generator).await {
            eprintln!("server exited: {:#}", e);
        }
    });
    wait_for_server(port).await;

    (format!("http://127.0.0.1:{}", port), handle)
}

async fn post_query(base: &str, path: &str, query: &str) -> (StatusCode, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .json(&json!({ "query": query }))
        .send()
        .await
        .unwrap();
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
    (status, resp.json().await.unwrap())
}

// ─── API server ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_exact_reference_over_http() {
    let tmp = TempDir::new().unwrap();
    let generator = QueuedGenerator::new(vec![]);
    let (base, handle) = start_server(&tmp, generator.clone()).await;

    let (status, body) = post_query(&base, "/api/orchestrator", "BG 2.47").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scripture"], "Bhagavad Gita");
    assert_eq!(body["queryType"], "EXACT_REFERENCE");
    assert!(body["response"]
        .as_str()
        .unwrap()
        .contains("**Swami Sivananda:**\nThy right is to work only."));
    let text = body["response"].as_str().unwrap();
    assert!(
        text.find("Swami Sivananda").unwrap() < text.find("Swami Gambirananda").unwrap(),
        "translations must follow file order"
    );
    assert!(generator.prompts.lock().unwrap().is_empty());

    handle.abort();
}

#[tokio::test]
async fn test_verse_search_resolves_through_lookup() {
    let tmp = TempDir::new().unwrap();
    let generator = QueuedGenerator::new(vec![Ok("Chapter 2, Verse 20".into())]);
    let (base, handle) = start_server(&tmp, generator.clone()).await;

    let (status, body) = post_query(&base, "/api/query", "the self is never born").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queryType"], "VERSE_SEARCH");
    assert!(body["response"]
        .as_str()
        .unwrap()
        .starts_with("**Bhagavad Gita, Chapter 2, Verse 20**"));
    assert_eq!(generator.prompts.lock().unwrap().len(), 1);

    handle.abort();
}

#[tokio::test]
async fn test_generation_failure_is_still_ok_response() {
    let tmp = TempDir::new().unwrap();
    let generator = QueuedGenerator::new(vec![Err("generateContent returned 503".into())]);
    let (base, handle) = start_server(&tmp, generator).await;

    let (status, body) = post_query(&base, "/api/orchestrator", "What is dharma?").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queryType"], "QUESTION");
    assert_eq!(body["response"], "Error: generateContent returned 503");

    handle.abort();
}

#[tokio::test]
async fn test_missing_verse_is_ok_response() {
    let tmp = TempDir::new().unwrap();
    let (base, handle) = start_server(&tmp, QueuedGenerator::new(vec![])).await;

    let (status, body) = post_query(&base, "/api/orchestrator", "2.99").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Verse 2.99 not found");

    let (status, body) = post_query(&base, "/api/orchestrator", "9.1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "File not found: bhagavad_gita_chapter_9.json");

    handle.abort();
}

#[tokio::test]
async fn test_malformed_body_is_500_with_error() {
    let tmp = TempDir::new().unwrap();
    let (base, handle) = start_server(&tmp, QueuedGenerator::new(vec![])).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/orchestrator", base))
        .json(&json!({ "query": 42 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    let resp = client
        .post(format!("{}/api/orchestrator", base))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    handle.abort();
}

#[tokio::test]
async fn test_health_and_scriptures() {
    let tmp = TempDir::new().unwrap();
    let (base, handle) = start_server(&tmp, QueuedGenerator::new(vec![])).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));

    let scriptures: Value = client
        .get(format!("{}/api/scriptures", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(scriptures["default"], "bhagavad-gita");
    let list = scriptures["scriptures"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["chapter_files"], 1);
    assert_eq!(list[0]["store_configured"], true);

    handle.abort();
}

// ─── Gemini client ──────────────────────────────────────────────────

type Captured = Arc<Mutex<Vec<Value>>>;

async fn stub_generate(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    captured.lock().unwrap().push(body);

    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if key != "good-key" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "code": 403, "message": "API key not valid" } })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Chapter 2, Verse 47" }] } }]
        })),
    )
}

async fn start_gemini_stub() -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/v1beta/models/gemini-test:generateContent",
            post(stub_generate),
        )
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1beta", addr), captured)
}

fn gemini_config(endpoint: String, api_key_env: &str) -> GenerationConfig {
    GenerationConfig {
        endpoint,
        model: "gemini-test".to_string(),
        api_key_env: api_key_env.to_string(),
        timeout_secs: 5,
        ..GenerationConfig::default()
    }
}

#[tokio::test]
async fn test_gemini_scoped_call_returns_text() {
    let (endpoint, captured) = start_gemini_stub().await;
    std::env::set_var("DHARMA_TEST_GEMINI_GOOD_KEY", "good-key");
    let generator =
        GeminiGenerator::new(&gemini_config(endpoint, "DHARMA_TEST_GEMINI_GOOD_KEY")).unwrap();

    let reply = generator
        .generate("Find this verse", Some("fileSearchStores/gita"))
        .await
        .unwrap();
    assert_eq!(reply.as_deref(), Some("Chapter 2, Verse 47"));

    let requests = captured.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0]["contents"][0]["parts"][0]["text"],
        "Find this verse"
    );
    assert_eq!(
        requests[0]["tools"][0]["file_search"]["file_search_store_names"][0],
        "fileSearchStores/gita"
    );
}

#[tokio::test]
async fn test_gemini_error_status_carries_message() {
    let (endpoint, _captured) = start_gemini_stub().await;
    std::env::set_var("DHARMA_TEST_GEMINI_BAD_KEY", "wrong-key");
    let generator =
        GeminiGenerator::new(&gemini_config(endpoint, "DHARMA_TEST_GEMINI_BAD_KEY")).unwrap();

    let err = generator.generate("hello", None).await.unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("403"), "unexpected error: {}", msg);
    assert!(msg.contains("API key not valid"), "unexpected error: {}", msg);
}

#[tokio::test]
async fn test_gemini_missing_key_makes_no_request() {
    let (endpoint, captured) = start_gemini_stub().await;
    let generator =
        GeminiGenerator::new(&gemini_config(endpoint, "DHARMA_TEST_GEMINI_NEVER_SET")).unwrap();

    let err = generator.generate("hello", None).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "DHARMA_TEST_GEMINI_NEVER_SET environment variable not set"
    );
    assert!(captured.lock().unwrap().is_empty());
}
