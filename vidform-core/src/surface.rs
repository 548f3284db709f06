//! Checkpoint presenter — the type-specific interaction surface.
//!
//! A `FormSurface` is the data model of the overlay shown for one checkpoint:
//! a prompt, an optional free-text input and zero or more single-select
//! groups. The host renders it however it likes; the runtime only needs the
//! group names and selected values back. Presentation is exclusive: a new
//! surface replaces the previous one wholesale, so no input state survives a
//! trigger.
//!
//! Group names follow the established field scheme so the batch submission
//! mapping stays stable: `rating_<id>_<feature>`, `scale_<id>`,
//! `choice_<id>`, `matrix_<id>_<row>`.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::checkpoint::{Checkpoint, CheckpointKind};
use crate::collector::AnswerEntry;

/// The three fixed rating-block choices as (value, label).
pub const RATING_CHOICES: [(&str, &str); 3] = [
    ("would_not_use", "Would not use"),
    ("neutral", "Neutral"),
    ("love_it", "Love it"),
];

const DEFAULT_RATING_FOLLOW_UP: &str = "Do you have any further thoughts on this category?";
const DEFAULT_MATRIX_FOLLOW_UP: &str = "Do you have any additional comments?";

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

/// One mutually-exclusive radio group.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceGroup {
    pub name: String,
    pub label: String,
    pub options: Vec<ChoiceOption>,
    pub selected: Option<String>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("no checkpoint is being presented")]
    NotPresenting,

    #[error("no input group named {0}")]
    UnknownGroup(String),

    #[error("group {group} has no option {value}")]
    UnknownOption { group: String, value: String },

    #[error("this surface has no free-text input")]
    NoTextInput,
}

#[derive(Debug, Clone)]
pub struct FormSurface {
    checkpoint_index: usize,
    question_id: String,
    video_time: f64,
    prompt: Option<String>,
    description: Option<String>,
    free_text_prompt: Option<String>,
    free_text: Option<String>,
    groups: Vec<ChoiceGroup>,
}

/// Replace anything outside `[A-Za-z0-9_-]` so feature/row keys are safe as
/// field-name segments.
pub fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl FormSurface {
    /// Build the surface for one checkpoint, exhaustively per kind.
    pub fn present(checkpoint: &Checkpoint, index: usize, video_time: f64) -> Self {
        let mut surface = Self {
            checkpoint_index: index,
            question_id: checkpoint.id.clone(),
            video_time,
            prompt: None,
            description: None,
            free_text_prompt: None,
            free_text: None,
            groups: Vec::new(),
        };

        match &checkpoint.kind {
            CheckpointKind::Text { question } => {
                surface.prompt = Some(question.clone());
                surface.free_text = Some(String::new());
            }
            CheckpointKind::SingleChoice { question, options } => {
                surface.prompt = Some(question.clone());
                surface.groups.push(ChoiceGroup {
                    name: format!("choice_{}", checkpoint.id),
                    label: question.clone(),
                    options: options
                        .iter()
                        .map(|option| ChoiceOption {
                            value: option.clone(),
                            label: option.clone(),
                        })
                        .collect(),
                    selected: None,
                });
            }
            CheckpointKind::Scale1To5 { question } => {
                surface.prompt = Some(question.clone());
                surface.groups.push(ChoiceGroup {
                    name: format!("scale_{}", checkpoint.id),
                    label: question.clone(),
                    options: (1..=5)
                        .map(|step| ChoiceOption {
                            value: step.to_string(),
                            label: step.to_string(),
                        })
                        .collect(),
                    selected: None,
                });
            }
            CheckpointKind::RatingBlock {
                title,
                description,
                features,
                free_text_label,
            } => {
                surface.prompt = Some(title.clone());
                surface.description = description.clone();
                for feature in features {
                    surface.groups.push(ChoiceGroup {
                        name: format!(
                            "rating_{}_{}",
                            checkpoint.id,
                            sanitize_key(&feature.id)
                        ),
                        label: feature.label.clone(),
                        options: RATING_CHOICES
                            .iter()
                            .map(|(value, label)| ChoiceOption {
                                value: value.to_string(),
                                label: label.to_string(),
                            })
                            .collect(),
                        selected: None,
                    });
                }
                surface.free_text = Some(String::new());
                surface.free_text_prompt = Some(
                    free_text_label
                        .clone()
                        .unwrap_or_else(|| DEFAULT_RATING_FOLLOW_UP.to_string()),
                );
            }
            CheckpointKind::Matrix {
                question,
                rows,
                columns,
                free_text_label,
            } => {
                surface.prompt = Some(question.clone());
                for row in rows {
                    surface.groups.push(ChoiceGroup {
                        name: format!("matrix_{}_{}", checkpoint.id, sanitize_key(row)),
                        label: row.clone(),
                        options: columns
                            .iter()
                            .map(|column| ChoiceOption {
                                value: sanitize_key(column).to_lowercase(),
                                label: column.clone(),
                            })
                            .collect(),
                        selected: None,
                    });
                }
                surface.free_text = Some(String::new());
                surface.free_text_prompt = Some(
                    free_text_label
                        .clone()
                        .unwrap_or_else(|| DEFAULT_MATRIX_FOLLOW_UP.to_string()),
                );
            }
        }

        surface
    }

    pub fn checkpoint_index(&self) -> usize {
        self.checkpoint_index
    }

    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    pub fn video_time(&self) -> f64 {
        self.video_time
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn free_text_prompt(&self) -> Option<&str> {
        self.free_text_prompt.as_deref()
    }

    pub fn free_text(&self) -> Option<&str> {
        self.free_text.as_deref()
    }

    pub fn has_text_input(&self) -> bool {
        self.free_text.is_some()
    }

    pub fn groups(&self) -> &[ChoiceGroup] {
        &self.groups
    }

    /// Overwrite the free-text input.
    pub fn enter_text(&mut self, text: impl Into<String>) -> Result<(), SurfaceError> {
        match &mut self.free_text {
            Some(slot) => {
                *slot = text.into();
                Ok(())
            }
            None => Err(SurfaceError::NoTextInput),
        }
    }

    /// Select `value` in the named group. The value must be one the group
    /// actually offers.
    pub fn select(&mut self, group: &str, value: &str) -> Result<(), SurfaceError> {
        let slot = self
            .groups
            .iter_mut()
            .find(|g| g.name == group)
            .ok_or_else(|| SurfaceError::UnknownGroup(group.to_string()))?;
        if !slot.options.iter().any(|option| option.value == value) {
            return Err(SurfaceError::UnknownOption {
                group: group.to_string(),
                value: value.to_string(),
            });
        }
        slot.selected = Some(value.to_string());
        Ok(())
    }

    /// Read every rendered input into one answer entry. Nothing is mandatory:
    /// empty inputs produce an empty answer and an empty rating map.
    ///
    /// The answer field is the trimmed free text when the surface has a text
    /// input; otherwise it is the selected value of the (single) choice
    /// group. Every selected group additionally lands in the ratings map
    /// under its field name.
    pub fn collect(&self, session_id: &str) -> AnswerEntry {
        let mut ratings = BTreeMap::new();
        for group in &self.groups {
            if let Some(value) = &group.selected {
                ratings.insert(group.name.clone(), value.clone());
            }
        }

        let answer = match &self.free_text {
            Some(text) => text.trim().to_string(),
            None => self
                .groups
                .iter()
                .find_map(|group| group.selected.clone())
                .unwrap_or_default(),
        };

        AnswerEntry {
            session_id: session_id.to_string(),
            question_id: self.question_id.clone(),
            checkpoint_index: self.checkpoint_index,
            video_time: self.video_time,
            answer,
            ratings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Feature;

    fn checkpoint(id: &str, kind: CheckpointKind) -> Checkpoint {
        Checkpoint {
            timestamp: 10.0,
            id: id.to_string(),
            kind,
        }
    }

    #[test]
    fn text_surface_collects_trimmed_answer() {
        let cp = checkpoint(
            "intro",
            CheckpointKind::Text {
                question: "What is your role?".to_string(),
            },
        );
        let mut surface = FormSurface::present(&cp, 1, 30.5);
        surface.enter_text("  engineer  ").unwrap();

        let entry = surface.collect("session_x");
        assert_eq!(entry.answer, "engineer");
        assert_eq!(entry.question_id, "intro");
        assert_eq!(entry.checkpoint_index, 1);
        assert!(entry.ratings.is_empty());
    }

    #[test]
    fn single_choice_surface_uses_selected_value_as_answer() {
        let cp = checkpoint(
            "company",
            CheckpointKind::SingleChoice {
                question: "What kind of company?".to_string(),
                options: vec!["OEM".to_string(), "EMS".to_string()],
            },
        );
        let mut surface = FormSurface::present(&cp, 0, 44.0);
        surface.select("choice_company", "EMS").unwrap();

        let entry = surface.collect("session_x");
        assert_eq!(entry.answer, "EMS");
        assert_eq!(entry.ratings.get("choice_company").map(String::as_str), Some("EMS"));
    }

    #[test]
    fn scale_surface_offers_five_steps() {
        let cp = checkpoint(
            "importance",
            CheckpointKind::Scale1To5 {
                question: "How important?".to_string(),
            },
        );
        let mut surface = FormSurface::present(&cp, 0, 76.0);

        let group = &surface.groups()[0];
        assert_eq!(group.name, "scale_importance");
        let values: Vec<&str> = group.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["1", "2", "3", "4", "5"]);

        surface.select("scale_importance", "4").unwrap();
        assert_eq!(surface.collect("s").answer, "4");
    }

    #[test]
    fn rating_block_builds_one_group_per_feature_plus_follow_up() {
        let cp = checkpoint(
            "category1",
            CheckpointKind::RatingBlock {
                title: "Category 1".to_string(),
                description: Some("Rate each feature.".to_string()),
                features: vec![
                    Feature {
                        id: "find prices".to_string(),
                        label: "Find prices".to_string(),
                    },
                    Feature {
                        id: "find_suppliers".to_string(),
                        label: "Find suppliers".to_string(),
                    },
                ],
                free_text_label: Some("What is missing?".to_string()),
            },
        );
        let mut surface = FormSurface::present(&cp, 0, 10.0);

        // Feature keys are sanitized into the group names.
        assert_eq!(surface.groups()[0].name, "rating_category1_find_prices");
        assert_eq!(surface.groups()[1].name, "rating_category1_find_suppliers");
        assert!(surface.has_text_input());
        assert_eq!(surface.free_text_prompt(), Some("What is missing?"));

        surface
            .select("rating_category1_find_prices", "love_it")
            .unwrap();
        surface.enter_text("alerts").unwrap();

        let entry = surface.collect("s");
        assert_eq!(entry.answer, "alerts");
        assert_eq!(
            entry.ratings.get("rating_category1_find_prices").map(String::as_str),
            Some("love_it")
        );
        assert!(!entry.ratings.contains_key("rating_category1_find_suppliers"));
    }

    #[test]
    fn matrix_surface_uses_sanitized_lowercase_column_values() {
        let cp = checkpoint(
            "usage",
            CheckpointKind::Matrix {
                question: "How often would you use each?".to_string(),
                rows: vec!["Part search".to_string()],
                columns: vec!["Every Day".to_string(), "Never".to_string()],
                free_text_label: None,
            },
        );
        let mut surface = FormSurface::present(&cp, 0, 50.0);

        let group = &surface.groups()[0];
        assert_eq!(group.name, "matrix_usage_Part_search");
        let values: Vec<&str> = group.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["every_day", "never"]);

        surface.select("matrix_usage_Part_search", "every_day").unwrap();
        let entry = surface.collect("s");
        assert_eq!(
            entry.ratings.get("matrix_usage_Part_search").map(String::as_str),
            Some("every_day")
        );
    }

    #[test]
    fn select_rejects_unknown_group_and_option() {
        let cp = checkpoint(
            "q",
            CheckpointKind::SingleChoice {
                question: "?".to_string(),
                options: vec!["a".to_string()],
            },
        );
        let mut surface = FormSurface::present(&cp, 0, 0.0);

        assert_eq!(
            surface.select("choice_other", "a").unwrap_err(),
            SurfaceError::UnknownGroup("choice_other".to_string())
        );
        assert!(matches!(
            surface.select("choice_q", "b").unwrap_err(),
            SurfaceError::UnknownOption { .. }
        ));
    }

    #[test]
    fn submission_proceeds_with_empty_inputs() {
        let cp = checkpoint(
            "q",
            CheckpointKind::Scale1To5 {
                question: "?".to_string(),
            },
        );
        let surface = FormSurface::present(&cp, 0, 0.0);

        let entry = surface.collect("s");
        assert_eq!(entry.answer, "");
        assert!(entry.ratings.is_empty());
    }

    #[test]
    fn sanitize_key_replaces_forbidden_chars() {
        assert_eq!(sanitize_key("find prices!"), "find_prices_");
        assert_eq!(sanitize_key("ok_key-1"), "ok_key-1");
    }
}
