//! Form and question CRUD routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use vidform_core::checkpoint::CheckpointKind;
use vidform_core::models::{Form, Question};

use crate::http::{error_body, AppState};

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct CreateFormRequest {
    pub title: Option<String>,
    pub youtube_video_id: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateFormRequest {
    pub title: Option<String>,
    pub youtube_video_id: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct QuestionRequest {
    pub timestamp_seconds: Option<f64>,
    pub question_type: Option<String>,
    pub question_data: Option<serde_json::Value>,
    pub display_order: Option<i32>,
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

/// List all forms, newest first.
pub async fn list_forms_inner(pool: &PgPool) -> (StatusCode, serde_json::Value) {
    let result = sqlx::query_as::<_, Form>(
        "SELECT id, title, youtube_video_id, is_published, created_at, updated_at \
         FROM forms ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await;

    match result {
        Ok(forms) => (StatusCode::OK, serde_json::json!({ "forms": forms })),
        Err(e) => {
            tracing::error!(error = %e, "listing forms failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to fetch forms"),
            )
        }
    }
}

/// Fetch one form with its questions ordered by timestamp.
pub async fn get_form_inner(pool: &PgPool, form_id: Uuid) -> (StatusCode, serde_json::Value) {
    let form = match sqlx::query_as::<_, Form>(
        "SELECT id, title, youtube_video_id, is_published, created_at, updated_at \
         FROM forms WHERE id = $1",
    )
    .bind(form_id)
    .fetch_optional(pool)
    .await
    {
        Ok(Some(form)) => form,
        Ok(None) => return (StatusCode::NOT_FOUND, error_body("Form not found")),
        Err(e) => {
            tracing::error!(error = %e, %form_id, "fetching form failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to fetch form"),
            );
        }
    };

    let questions = match sqlx::query_as::<_, Question>(
        "SELECT id, form_id, timestamp_seconds, question_type, question_data, display_order, created_at \
         FROM questions WHERE form_id = $1 ORDER BY timestamp_seconds ASC",
    )
    .bind(form_id)
    .fetch_all(pool)
    .await
    {
        Ok(questions) => questions,
        Err(e) => {
            tracing::error!(error = %e, %form_id, "fetching questions failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to fetch form"),
            );
        }
    };

    let mut body = serde_json::json!(form);
    body["questions"] = serde_json::json!(questions);
    (StatusCode::OK, serde_json::json!({ "form": body }))
}

/// Create a form. Title and video id are required.
pub async fn create_form_inner(
    pool: &PgPool,
    request: CreateFormRequest,
) -> (StatusCode, serde_json::Value) {
    let (title, youtube_video_id) = match (request.title, request.youtube_video_id) {
        (Some(title), Some(video)) if !title.is_empty() && !video.is_empty() => (title, video),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                error_body("Title and YouTube video ID are required"),
            )
        }
    };

    let result = sqlx::query_as::<_, Form>(
        "INSERT INTO forms (title, youtube_video_id, is_published) VALUES ($1, $2, $3) \
         RETURNING id, title, youtube_video_id, is_published, created_at, updated_at",
    )
    .bind(&title)
    .bind(&youtube_video_id)
    .bind(request.is_published.unwrap_or(false))
    .fetch_one(pool)
    .await;

    match result {
        Ok(form) => (
            StatusCode::OK,
            serde_json::json!({ "success": true, "form": form }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "creating form failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to create form"),
            )
        }
    }
}

/// Partial form update; absent fields keep their value.
pub async fn update_form_inner(
    pool: &PgPool,
    form_id: Uuid,
    request: UpdateFormRequest,
) -> (StatusCode, serde_json::Value) {
    let result = sqlx::query_as::<_, Form>(
        "UPDATE forms SET \
             title = COALESCE($2, title), \
             youtube_video_id = COALESCE($3, youtube_video_id), \
             is_published = COALESCE($4, is_published), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, title, youtube_video_id, is_published, created_at, updated_at",
    )
    .bind(form_id)
    .bind(request.title)
    .bind(request.youtube_video_id)
    .bind(request.is_published)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(Some(form)) => (
            StatusCode::OK,
            serde_json::json!({ "success": true, "form": form }),
        ),
        Ok(None) => (StatusCode::NOT_FOUND, error_body("Form not found")),
        Err(e) => {
            tracing::error!(error = %e, %form_id, "updating form failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to update form"),
            )
        }
    }
}

pub async fn delete_form_inner(pool: &PgPool, form_id: Uuid) -> (StatusCode, serde_json::Value) {
    match sqlx::query("DELETE FROM forms WHERE id = $1")
        .bind(form_id)
        .execute(pool)
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            serde_json::json!({ "success": true, "message": "Form deleted successfully" }),
        ),
        Err(e) => {
            tracing::error!(error = %e, %form_id, "deleting form failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to delete form"),
            )
        }
    }
}

/// Add a question to a form. The `(question_type, question_data)` pair must
/// parse as a checkpoint payload.
pub async fn add_question_inner(
    pool: &PgPool,
    form_id: Uuid,
    request: QuestionRequest,
) -> (StatusCode, serde_json::Value) {
    let (timestamp_seconds, question_type, question_data) = match (
        request.timestamp_seconds,
        request.question_type,
        request.question_data,
    ) {
        (Some(ts), Some(qt), Some(qd)) => (ts, qt, qd),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                error_body("Timestamp, question type, and question data are required"),
            )
        }
    };

    if let Err(e) = CheckpointKind::from_parts(&question_type, &question_data) {
        return (
            StatusCode::BAD_REQUEST,
            error_body(format!("Invalid question payload: {e}")),
        );
    }

    let result = sqlx::query_as::<_, Question>(
        "INSERT INTO questions (form_id, timestamp_seconds, question_type, question_data, display_order) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, form_id, timestamp_seconds, question_type, question_data, display_order, created_at",
    )
    .bind(form_id)
    .bind(timestamp_seconds)
    .bind(&question_type)
    .bind(&question_data)
    .bind(request.display_order.unwrap_or(0))
    .fetch_one(pool)
    .await;

    match result {
        Ok(question) => (
            StatusCode::OK,
            serde_json::json!({ "success": true, "question": question }),
        ),
        Err(e) => {
            tracing::error!(error = %e, %form_id, "adding question failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to add question"),
            )
        }
    }
}

/// Partial question update; the payload is revalidated when both the type and
/// the data are replaced together.
pub async fn update_question_inner(
    pool: &PgPool,
    question_id: Uuid,
    request: QuestionRequest,
) -> (StatusCode, serde_json::Value) {
    if let (Some(question_type), Some(question_data)) =
        (&request.question_type, &request.question_data)
    {
        if let Err(e) = CheckpointKind::from_parts(question_type, question_data) {
            return (
                StatusCode::BAD_REQUEST,
                error_body(format!("Invalid question payload: {e}")),
            );
        }
    }

    let result = sqlx::query_as::<_, Question>(
        "UPDATE questions SET \
             timestamp_seconds = COALESCE($2, timestamp_seconds), \
             question_type = COALESCE($3, question_type), \
             question_data = COALESCE($4, question_data), \
             display_order = COALESCE($5, display_order) \
         WHERE id = $1 \
         RETURNING id, form_id, timestamp_seconds, question_type, question_data, display_order, created_at",
    )
    .bind(question_id)
    .bind(request.timestamp_seconds)
    .bind(request.question_type)
    .bind(request.question_data)
    .bind(request.display_order)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(Some(question)) => (
            StatusCode::OK,
            serde_json::json!({ "success": true, "question": question }),
        ),
        Ok(None) => (StatusCode::NOT_FOUND, error_body("Question not found")),
        Err(e) => {
            tracing::error!(error = %e, %question_id, "updating question failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to update question"),
            )
        }
    }
}

pub async fn delete_question_inner(
    pool: &PgPool,
    question_id: Uuid,
) -> (StatusCode, serde_json::Value) {
    match sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(question_id)
        .execute(pool)
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            serde_json::json!({ "success": true, "message": "Question deleted successfully" }),
        ),
        Err(e) => {
            tracing::error!(error = %e, %question_id, "deleting question failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to delete question"),
            )
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn list_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = list_forms_inner(&state.pool).await;
    (status, Json(body))
}

pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<Uuid>,
) -> impl IntoResponse {
    let (status, body) = get_form_inner(&state.pool, form_id).await;
    (status, Json(body))
}

pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateFormRequest>,
) -> impl IntoResponse {
    let (status, body) = create_form_inner(&state.pool, request).await;
    (status, Json(body))
}

pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<UpdateFormRequest>,
) -> impl IntoResponse {
    let (status, body) = update_form_inner(&state.pool, form_id, request).await;
    (status, Json(body))
}

pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<Uuid>,
) -> impl IntoResponse {
    let (status, body) = delete_form_inner(&state.pool, form_id).await;
    (status, Json(body))
}

pub async fn add_question_handler(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<QuestionRequest>,
) -> impl IntoResponse {
    let (status, body) = add_question_inner(&state.pool, form_id, request).await;
    (status, Json(body))
}

pub async fn update_question_handler(
    State(state): State<Arc<AppState>>,
    Path((_form_id, question_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<QuestionRequest>,
) -> impl IntoResponse {
    let (status, body) = update_question_inner(&state.pool, question_id, request).await;
    (status, Json(body))
}

pub async fn delete_question_handler(
    State(state): State<Arc<AppState>>,
    Path((_form_id, question_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let (status, body) = delete_question_inner(&state.pool, question_id).await;
    (status, Json(body))
}
