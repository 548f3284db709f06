//! Checkpoint store — the ordered set of timestamp-triggered questions.
//!
//! Checkpoints are loaded once per session (from host configuration or from a
//! form's persisted questions) and never mutated afterwards. Construction
//! sorts by timestamp so downstream evaluation is always in ascending order
//! regardless of source order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Question;

/// One feature row inside a rating block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub label: String,
}

/// Type-specific checkpoint payload, one variant per question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckpointKind {
    Text {
        question: String,
    },
    SingleChoice {
        question: String,
        options: Vec<String>,
    },
    #[serde(rename = "scale_1_to_5")]
    Scale1To5 {
        question: String,
    },
    RatingBlock {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        features: Vec<Feature>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        free_text_label: Option<String>,
    },
    Matrix {
        question: String,
        rows: Vec<String>,
        columns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        free_text_label: Option<String>,
    },
}

impl CheckpointKind {
    /// The tag stored in the `question_type` column.
    pub fn type_name(&self) -> &'static str {
        match self {
            CheckpointKind::Text { .. } => "text",
            CheckpointKind::SingleChoice { .. } => "single_choice",
            CheckpointKind::Scale1To5 { .. } => "scale_1_to_5",
            CheckpointKind::RatingBlock { .. } => "rating_block",
            CheckpointKind::Matrix { .. } => "matrix",
        }
    }

    /// Recombine a `question_type` column value with its untagged payload
    /// object into the tagged union.
    pub fn from_parts(
        question_type: &str,
        payload: &serde_json::Value,
    ) -> Result<Self, CheckpointError> {
        let mut map = match payload {
            serde_json::Value::Object(map) => map.clone(),
            _ => return Err(CheckpointError::PayloadNotObject),
        };
        map.insert(
            "type".to_string(),
            serde_json::Value::String(question_type.to_string()),
        );
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }
}

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("question payload is not a JSON object")]
    PayloadNotObject,

    #[error("unrecognized question payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Immutable checkpoint definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Trigger position in seconds, non-negative.
    pub timestamp: f64,
    /// Unique within one session's checkpoint set.
    pub id: String,
    #[serde(flatten)]
    pub kind: CheckpointKind,
}

impl Checkpoint {
    /// Build a checkpoint from a persisted question row.
    pub fn from_question(question: &Question) -> Result<Self, CheckpointError> {
        let kind = CheckpointKind::from_parts(&question.question_type, &question.question_data)?;
        Ok(Self {
            timestamp: question.timestamp_seconds,
            id: question.id.to_string(),
            kind,
        })
    }
}

/// Ordered checkpoint collection. Sorted ascending by timestamp at
/// construction; the sort is stable so equal timestamps keep source order.
#[derive(Debug, Clone, Default)]
pub struct CheckpointSet {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointSet {
    pub fn new(mut checkpoints: Vec<Checkpoint>) -> Self {
        checkpoints.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self { checkpoints }
    }

    pub fn from_questions(questions: &[Question]) -> Result<Self, CheckpointError> {
        let checkpoints = questions
            .iter()
            .map(Checkpoint::from_question)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(checkpoints))
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Checkpoint> {
        self.checkpoints.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(id: &str, timestamp: f64) -> Checkpoint {
        Checkpoint {
            timestamp,
            id: id.to_string(),
            kind: CheckpointKind::Text {
                question: format!("question {id}"),
            },
        }
    }

    #[test]
    fn construction_sorts_by_timestamp() {
        let set = CheckpointSet::new(vec![text("c", 50.0), text("a", 10.0), text("b", 30.0)]);

        let ids: Vec<&str> = set.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_timestamps_keep_source_order() {
        let set = CheckpointSet::new(vec![text("first", 44.0), text("second", 44.0)]);

        let ids: Vec<&str> = set.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn kind_tag_round_trips() {
        let kind = CheckpointKind::Scale1To5 {
            question: "How important is this?".to_string(),
        };
        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(value["type"], "scale_1_to_5");

        let back: CheckpointKind = serde_json::from_value(value).unwrap();
        assert_eq!(back, kind);
    }

    #[test]
    fn from_parts_builds_rating_block() {
        let payload = serde_json::json!({
            "title": "Category 1",
            "description": "Rate each feature.",
            "features": [
                { "id": "find_prices", "label": "Find prices" },
                { "id": "find_suppliers", "label": "Find suppliers" }
            ],
            "free_text_label": "What is missing?"
        });

        let kind = CheckpointKind::from_parts("rating_block", &payload).unwrap();
        match kind {
            CheckpointKind::RatingBlock { title, features, .. } => {
                assert_eq!(title, "Category 1");
                assert_eq!(features.len(), 2);
            }
            other => panic!("expected rating block, got {other:?}"),
        }
    }

    #[test]
    fn from_parts_rejects_non_object_payload() {
        let err = CheckpointKind::from_parts("text", &serde_json::json!("nope")).unwrap_err();
        assert!(matches!(err, CheckpointError::PayloadNotObject));
    }

    #[test]
    fn from_parts_rejects_unknown_type() {
        let err = CheckpointKind::from_parts("essay", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, CheckpointError::Payload(_)));
    }
}
