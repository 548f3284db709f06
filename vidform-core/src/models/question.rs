use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A timestamp-anchored question belonging to one form. The type-specific
/// payload sits untagged in `question_data` next to the `question_type`
/// column; `Checkpoint::from_question` recombines them.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: Uuid,
    pub form_id: Uuid,
    pub timestamp_seconds: f64,
    pub question_type: String,
    pub question_data: serde_json::Value,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}
