//! Answer accumulation and serialization.
//!
//! One `AnswerEntry` is produced per submitted checkpoint. Entries are held
//! in the session accumulator and serialized two ways: a flat key-value field
//! set for the batch form post, and CSV for operator export.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One submitted checkpoint's worth of operator input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub session_id: String,
    pub question_id: String,
    pub checkpoint_index: usize,
    /// Playback position at trigger time, seconds.
    pub video_time: f64,
    /// Free text, or the selected value for single-select checkpoints.
    pub answer: String,
    /// Radio group name -> selected value, for every group with a selection.
    #[serde(default)]
    pub ratings: BTreeMap<String, String>,
}

/// Flatten accumulated entries into the batch submission field set.
///
/// Per entry: a non-empty answer becomes `<qid>_answer`; each non-empty
/// rating value becomes `<qid>_rating_<feature>`, where the feature part is
/// the rating key stripped of its `rating_<qid>_` prefix (falling back to a
/// bare `rating_` strip, then to the key verbatim). Entries without a
/// question id are skipped; later entries overwrite same-named fields.
pub fn batch_fields(entries: &[AnswerEntry]) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();

    for entry in entries {
        if entry.question_id.is_empty() {
            continue;
        }
        let qid = &entry.question_id;

        if !entry.answer.is_empty() {
            put_field(&mut fields, format!("{qid}_answer"), entry.answer.clone());
        }

        let expected_prefix = format!("rating_{qid}_");
        for (key, value) in &entry.ratings {
            if value.is_empty() {
                continue;
            }
            let feature = if let Some(rest) = key.strip_prefix(&expected_prefix) {
                rest
            } else if let Some(rest) = key.strip_prefix("rating_") {
                rest
            } else {
                key.as_str()
            };
            put_field(
                &mut fields,
                format!("{qid}_rating_{feature}"),
                value.clone(),
            );
        }
    }

    fields
}

fn put_field(fields: &mut Vec<(String, String)>, name: String, value: String) {
    if let Some(slot) = fields.iter_mut().find(|(existing, _)| *existing == name) {
        slot.1 = value;
    } else {
        fields.push((name, value));
    }
}

/// Quote a CSV cell when it contains a quote, comma or newline; embedded
/// quotes are doubled.
pub fn csv_escape(value: &str) -> String {
    let needs_quotes = value.contains(|c| c == '"' || c == ',' || c == '\n');
    let escaped = value.replace('"', "\"\"");
    if needs_quotes {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

/// Render accumulated entries as CSV: the base columns followed by the
/// sorted union of all rating keys; missing ratings are empty cells.
pub fn answers_to_csv(entries: &[AnswerEntry]) -> String {
    let mut rating_keys: Vec<String> = entries
        .iter()
        .flat_map(|entry| entry.ratings.keys().cloned())
        .collect();
    rating_keys.sort();
    rating_keys.dedup();

    let mut headers: Vec<String> = [
        "session_id",
        "question_id",
        "checkpoint_index",
        "video_time",
        "answer",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();
    headers.extend(rating_keys.iter().cloned());

    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| csv_escape(h))
            .collect::<Vec<_>>()
            .join(","),
    );

    for entry in entries {
        let mut row = vec![
            entry.session_id.clone(),
            entry.question_id.clone(),
            entry.checkpoint_index.to_string(),
            entry.video_time.to_string(),
            entry.answer.clone(),
        ];
        for key in &rating_keys {
            row.push(entry.ratings.get(key).cloned().unwrap_or_default());
        }
        lines.push(
            row.iter()
                .map(|cell| csv_escape(cell))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}
