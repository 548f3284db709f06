//! Vidform HTTP REST API
//!
//! Axum-based HTTP server exposing the form/question/response CRUD surface
//! over PostgreSQL.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a
//! pure inner function returning `(StatusCode, serde_json::Value)`. The inner
//! functions are directly testable without axum dispatch machinery.
//!
//! Endpoints:
//! - GET    /api/health                                   — health check with DB status
//! - GET    /api/forms                                    — list forms
//! - POST   /api/forms                                    — create a form
//! - GET    /api/forms/:form_id                           — form with its questions
//! - PUT    /api/forms/:form_id                           — update a form
//! - DELETE /api/forms/:form_id                           — delete a form
//! - POST   /api/forms/:form_id/questions                 — add a question
//! - PUT    /api/forms/:form_id/questions/:question_id    — update a question
//! - DELETE /api/forms/:form_id/questions/:question_id    — delete a question
//! - POST   /api/responses                                — record one answer
//! - GET    /api/responses/form/:form_id                  — responses with nested answers

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use vidform_core::VidformConfig;

use crate::routes::{forms, responses};

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/forms",
            get(forms::list_handler).post(forms::create_handler),
        )
        .route(
            "/api/forms/:form_id",
            get(forms::get_handler)
                .put(forms::update_handler)
                .delete(forms::delete_handler),
        )
        .route("/api/forms/:form_id/questions", post(forms::add_question_handler))
        .route(
            "/api/forms/:form_id/questions/:question_id",
            put(forms::update_question_handler).delete(forms::delete_question_handler),
        )
        .route("/api/responses", post(responses::record_handler))
        .route(
            "/api/responses/form/:form_id",
            get(responses::list_handler),
        )
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    pool: PgPool,
    config: VidformConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let state = Arc::new(AppState { pool });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Vidform HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

/// Standard error body.
pub fn error_body(message: impl Into<String>) -> serde_json::Value {
    serde_json::json!({ "error": message.into() })
}

/// Inner health check — probes the DB and returns (status_code, json_body).
pub async fn health_inner(pool: &PgPool) -> (StatusCode, serde_json::Value) {
    match vidform_core::db::health_check(pool).await {
        Ok(pg_version) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "ok",
                "timestamp": chrono::Utc::now(),
                "version": env!("CARGO_PKG_VERSION"),
                "database": "connected",
                "postgresql": pg_version,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "error",
                "timestamp": chrono::Utc::now(),
                "version": env!("CARGO_PKG_VERSION"),
                "database": "not connected",
                "error": e.to_string(),
            }),
        ),
    }
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.pool).await;
    (status, Json(body))
}
