use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One viewer's response to a form; at most one per `(form_id, session_id)`
/// by intent (lookup-then-create, not enforced by a constraint).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResponseRecord {
    pub id: Uuid,
    pub form_id: Uuid,
    pub session_id: String,
    pub viewer_metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnswerRow {
    pub id: Uuid,
    pub response_id: Uuid,
    pub question_id: Uuid,
    pub answer_data: serde_json::Value,
    pub video_timestamp: Option<f64>,
    pub created_at: DateTime<Utc>,
}
