//! Response recording and listing routes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use vidform_core::models::{AnswerRow, ResponseRecord};

use crate::http::{error_body, AppState};

#[derive(Debug, Deserialize, Default)]
pub struct RecordAnswerRequest {
    pub form_id: Option<Uuid>,
    pub question_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub answer_data: Option<serde_json::Value>,
    pub video_timestamp: Option<f64>,
}

/// One answer row joined with its question's definition (absent when the
/// question was deleted after submission).
#[derive(Debug, sqlx::FromRow)]
struct AnswerWithQuestion {
    id: Uuid,
    response_id: Uuid,
    question_id: Uuid,
    answer_data: serde_json::Value,
    video_timestamp: Option<f64>,
    created_at: DateTime<Utc>,
    timestamp_seconds: Option<f64>,
    question_type: Option<String>,
    question_data: Option<serde_json::Value>,
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

/// Record one answer for a session. The response row for
/// `(form_id, session_id)` is looked up and created when absent — the first
/// answer of a session creates it, later answers reuse it. Lookup-then-create
/// rather than an upsert: two near-simultaneous first answers can both miss
/// and create duplicate rows; this is a known, accepted race.
pub async fn record_answer_inner(
    pool: &PgPool,
    request: RecordAnswerRequest,
    user_agent: Option<String>,
) -> (StatusCode, serde_json::Value) {
    let (form_id, question_id, session_id, answer_data) = match (
        request.form_id,
        request.question_id,
        request.session_id,
        request.answer_data,
    ) {
        (Some(form_id), Some(question_id), Some(session_id), Some(answer_data)) => {
            (form_id, question_id, session_id, answer_data)
        }
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                error_body("Missing required fields"),
            )
        }
    };

    let existing = match sqlx::query_as::<_, (Uuid,)>(
        "SELECT id FROM responses WHERE form_id = $1 AND session_id = $2",
    )
    .bind(form_id)
    .bind(&session_id)
    .fetch_optional(pool)
    .await
    {
        Ok(row) => row.map(|(id,)| id),
        Err(e) => {
            tracing::error!(error = %e, %form_id, "looking up response failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to save response"),
            );
        }
    };

    let response_id = match existing {
        Some(id) => id,
        None => {
            let viewer_metadata = serde_json::json!({
                "user_agent": user_agent,
                "timestamp": Utc::now(),
            });
            match sqlx::query_as::<_, (Uuid,)>(
                "INSERT INTO responses (form_id, session_id, viewer_metadata) \
                 VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(form_id)
            .bind(&session_id)
            .bind(&viewer_metadata)
            .fetch_one(pool)
            .await
            {
                Ok((id,)) => id,
                Err(e) => {
                    tracing::error!(error = %e, %form_id, "creating response failed");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        error_body("Failed to save response"),
                    );
                }
            }
        }
    };

    let result = sqlx::query_as::<_, AnswerRow>(
        "INSERT INTO answers (response_id, question_id, answer_data, video_timestamp) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, response_id, question_id, answer_data, video_timestamp, created_at",
    )
    .bind(response_id)
    .bind(question_id)
    .bind(&answer_data)
    .bind(request.video_timestamp)
    .fetch_one(pool)
    .await;

    match result {
        Ok(answer) => (
            StatusCode::OK,
            serde_json::json!({ "success": true, "answer": answer }),
        ),
        Err(e) => {
            tracing::error!(error = %e, %response_id, "saving answer failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to save response"),
            )
        }
    }
}

/// List a form's responses, newest first, each with its answers and the
/// answered question's definition.
pub async fn list_responses_inner(
    pool: &PgPool,
    form_id: Uuid,
) -> (StatusCode, serde_json::Value) {
    let responses = match sqlx::query_as::<_, ResponseRecord>(
        "SELECT id, form_id, session_id, viewer_metadata, created_at \
         FROM responses WHERE form_id = $1 ORDER BY created_at DESC",
    )
    .bind(form_id)
    .fetch_all(pool)
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, %form_id, "listing responses failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to fetch responses"),
            );
        }
    };

    let answers = match sqlx::query_as::<_, AnswerWithQuestion>(
        "SELECT a.id, a.response_id, a.question_id, a.answer_data, a.video_timestamp, a.created_at, \
                q.timestamp_seconds, q.question_type, q.question_data \
         FROM answers a \
         JOIN responses r ON r.id = a.response_id \
         LEFT JOIN questions q ON q.id = a.question_id \
         WHERE r.form_id = $1 \
         ORDER BY a.created_at ASC",
    )
    .bind(form_id)
    .fetch_all(pool)
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, %form_id, "listing answers failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to fetch responses"),
            );
        }
    };

    let mut by_response: HashMap<Uuid, Vec<serde_json::Value>> = HashMap::new();
    for answer in answers {
        let question = match (&answer.question_type, &answer.question_data) {
            (Some(question_type), Some(question_data)) => serde_json::json!({
                "timestamp_seconds": answer.timestamp_seconds,
                "question_type": question_type,
                "question_data": question_data,
            }),
            _ => serde_json::Value::Null,
        };
        by_response
            .entry(answer.response_id)
            .or_default()
            .push(serde_json::json!({
                "id": answer.id,
                "question_id": answer.question_id,
                "answer_data": answer.answer_data,
                "video_timestamp": answer.video_timestamp,
                "created_at": answer.created_at,
                "question": question,
            }));
    }

    let body: Vec<serde_json::Value> = responses
        .into_iter()
        .map(|response| {
            let answers = by_response.remove(&response.id).unwrap_or_default();
            serde_json::json!({
                "id": response.id,
                "session_id": response.session_id,
                "viewer_metadata": response.viewer_metadata,
                "created_at": response.created_at,
                "answers": answers,
            })
        })
        .collect();

    (
        StatusCode::OK,
        serde_json::json!({ "success": true, "responses": body }),
    )
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn record_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RecordAnswerRequest>,
) -> impl IntoResponse {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    let (status, body) = record_answer_inner(&state.pool, request, user_agent).await;
    (status, Json(body))
}

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<Uuid>,
) -> impl IntoResponse {
    let (status, body) = list_responses_inner(&state.pool, form_id).await;
    (status, Json(body))
}
