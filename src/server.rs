//! HTTP query server.
//!
//! Exposes the online query path to the CMS's public chat API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer a question over indexed content |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses carry a JSON body:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must be between 3 and 2000 characters" } }
//! ```
//!
//! Validation failures map to 400; vector-store outages surface as a 503
//! with a generic message. Raw upstream error bodies go to stderr only.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::ask::{answer_question, AskRequest, AskResponse};
use crate::config::Config;
use crate::embedding::Embedder;
use crate::generate::{ChatModel, OpenAiChat};
use crate::store::{QdrantStore, VectorStore};

/// Shared application state; everything here is read-only per request.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    embedder: Arc<Embedder>,
    store: Arc<dyn VectorStore>,
    model: Arc<dyn ChatModel>,
}

/// Starts the query server with the production backends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let embedder = Arc::new(Embedder::from_config(&config.embedding)?);
    let store: Arc<dyn VectorStore> = Arc::new(QdrantStore::new(&config.vector_store)?);
    let model: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(&config.generation)?);
    run_server_with_backends(config, embedder, store, model).await
}

/// Starts the query server over explicit backends (used by tests and
/// custom binaries).
pub async fn run_server_with_backends(
    config: &Config,
    embedder: Arc<Embedder>,
    store: Arc<dyn VectorStore>,
    model: Arc<dyn ChatModel>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        embedder,
        store,
        model,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("query server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn service_unavailable() -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "upstream_unavailable".to_string(),
        message: "retrieval backend is unavailable, try again shortly".to_string(),
    }
}

/// Validation failures surface verbatim as 400s; anything else is an
/// upstream outage whose detail belongs in the logs, not the response.
/// The match is anchored to the exact validation prefix so an upstream
/// error body can never masquerade as a validation message.
fn classify_ask_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();
    if msg.starts_with("question must be") {
        bad_request(msg)
    } else {
        eprintln!("ask failed: {:#}", err);
        service_unavailable()
    }
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

// ============ POST /ask ============

async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let response = answer_question(
        &request,
        &state.config,
        &state.embedder,
        state.store.as_ref(),
        state.model.as_ref(),
    )
    .await
    .map_err(classify_ask_error)?;

    Ok(Json(response))
}
