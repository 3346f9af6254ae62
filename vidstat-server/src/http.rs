//! Vidstat HTTP API
//!
//! Axum server exposing the same question pipeline as the Telegram bot, for
//! scripting and local testing. Each endpoint is a thin axum handler over an
//! inner function that tests call directly.
//!
//! Endpoints:
//! - GET  /health  — database status and missing analytics tables
//! - GET  /version — server version info
//! - POST /ask     — `{"question": "..."}` answered with `{"answer": "..."}`

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use vidstat_core::config::HttpConfig;

use crate::handler::AppContext;

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub pool: PgPool,
    pub ctx: Arc<AppContext>,
}

pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/ask", post(ask_handler))
        .with_state(state)
}

/// Serve until the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    config: &HttpConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Vidstat HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

#[derive(Debug, Deserialize, Default)]
pub struct AskRequest {
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }
}

pub async fn health_inner(pool: &PgPool) -> (StatusCode, serde_json::Value) {
    let pg_ver = match vidstat_core::db::health_check(pool).await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                }),
            );
        }
    };

    let missing = match vidstat_core::db::missing_tables(pool).await {
        Ok(m) => m,
        Err(e) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                }),
            );
        }
    };

    let status = if missing.is_empty() { "healthy" } else { "degraded" };
    (
        StatusCode::OK,
        serde_json::json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "postgresql": pg_ver,
            "missing_tables": missing,
        }),
    )
}

pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "service": "vidstat",
    })
}

/// Run one question through the conversation handler.
///
/// Pipeline failures still answer 200: the body carries the same reply the
/// bot would send, with `status` set to `"error"`.
pub async fn ask_inner(ctx: &AppContext, req: AskRequest) -> (StatusCode, serde_json::Value) {
    let question = match req.question {
        Some(q) if !q.trim().is_empty() => q,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                serde_json::json!(ErrorResponse::new("question field is required")),
            );
        }
    };

    let start = Instant::now();
    let intent = ctx.process(&question).await;

    (
        StatusCode::OK,
        serde_json::json!({
            "answer": intent.reply(),
            "status": if intent.is_answered() { "ok" } else { "error" },
            "took_ms": start.elapsed().as_millis() as u64,
        }),
    )
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.pool).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn ask_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<AskRequest>,
) -> impl IntoResponse {
    let (status, body) = ask_inner(&state.ctx, req).await;
    (status, Json(body))
}
