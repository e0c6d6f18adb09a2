//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/orchestrator` | Route a `{ "query": ... }` body |
//! | `POST` | `/api/query` | Alias of `/api/orchestrator` |
//! | `GET`  | `/api/scriptures` | Configured scripture profiles and their health |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Every routed query answers HTTP 200, including not-found results and
//! failed calls to the text-generation service; those are carried in the
//! `response` text. Only faults at the request boundary, such as a body
//! that is not `{ "query": string }`, answer HTTP 500:
//!
//! ```json
//! { "error": "Failed to deserialize the JSON body into the target type: ..." }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser
//! front-end can be served from another origin.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::generation::{create_generator, TextGenerator};
use crate::models::{QueryRequest, QueryResponse};
use crate::router::QueryRouter;
use crate::sources::{get_sources, SourceStatus};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    router: QueryRouter,
}

/// Starts the HTTP server with the generator named in `[generation]`.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let generator = create_generator(&config.generation)?;
    run_server_with_generator(config, generator).await
}

/// Starts the HTTP server around an existing [`TextGenerator`].
///
/// # Example
///
/// ```rust,no_run
/// use dharma::generation::DisabledGenerator;
/// use dharma::server::run_server_with_generator;
/// use std::sync::Arc;
///
/// # async fn example(config: &dharma::config::Config) -> anyhow::Result<()> {
/// run_server_with_generator(config, Arc::new(DisabledGenerator)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_server_with_generator(
    config: &Config,
    generator: Arc<dyn TextGenerator>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let router = QueryRouter::with_generator(config, generator)?;

    tracing::info!(
        model = %router.generator().model_name(),
        stores = ?router.registry().active_stores(),
        "document-search stores"
    );
    for profile in router.registry().profiles() {
        if !profile.is_store_configured() {
            tracing::warn!(
                "{} has no document-search store; searches and questions will fail",
                profile.name
            );
        }
    }

    let state = AppState {
        config: Arc::new(config.clone()),
        router,
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/orchestrator", post(handle_query))
        .route("/api/query", post(handle_query))
        .route("/api/scriptures", get(handle_scriptures))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
    }
}

// ============ POST /api/orchestrator ============

async fn handle_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!("rejected request body: {}", rejection.body_text());
        internal_error(rejection.body_text())
    })?;

    let outcome = state.router.route(&request.query).await;
    Ok(Json(outcome.into()))
}

// ============ GET /api/scriptures ============

#[derive(Serialize)]
struct ScripturesResponse {
    default: String,
    scriptures: Vec<SourceStatus>,
}

/// Scanning data directories is blocking I/O, so it runs off the executor.
async fn handle_scriptures(
    State(state): State<AppState>,
) -> Result<Json<ScripturesResponse>, AppError> {
    let router = state.router.clone();
    let scriptures = tokio::task::spawn_blocking(move || get_sources(router.registry()))
        .await
        .map_err(|e| internal_error(format!("scripture scan failed: {}", e)))?;

    Ok(Json(ScripturesResponse {
        default: state.config.scriptures.default.clone(),
        scriptures,
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
