//! Survey session state machine.
//!
//! One `SurveySession` is constructed per viewing and owns all mutable
//! session state: the visitation set, the cursor, the answer accumulator and
//! the current phase. Nothing here is process-global, so concurrent sessions
//! (and tests) cannot leak into each other.
//!
//! Phases and transitions:
//! - Idle/Playing -> Presenting(i) when a sample crosses the cursor checkpoint
//! - Presenting(i) -> Submitting(i) on the submit action
//! - Submitting(i) -> Playing on success (or per-answer mode regardless)
//! - Submitting(i) -> Presenting(i) on batch flush failure, for retry

use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use crate::checkpoint::CheckpointSet;
use crate::collector::AnswerEntry;

/// Generate the per-viewing session key used to correlate all answers.
pub fn new_session_key() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Playing,
    Presenting(usize),
    Submitting(usize),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("a submission is already in flight")]
    SubmitInFlight,

    #[error("no checkpoint is being presented")]
    NoActiveCheckpoint,
}

/// Handed out by [`SurveySession::begin_submit`]; `retry` is set when the
/// entry was already collected and only the terminal flush must be repeated.
#[derive(Debug, Clone, Copy)]
pub struct SubmitTicket {
    pub index: usize,
    pub retry: bool,
}

#[derive(Debug)]
pub struct SurveySession {
    key: String,
    checkpoints: CheckpointSet,
    visited: HashSet<usize>,
    cursor: usize,
    phase: SessionPhase,
    answers: Vec<AnswerEntry>,
    pending_flush: bool,
}

impl SurveySession {
    pub fn new(key: String, checkpoints: CheckpointSet) -> Self {
        Self {
            key,
            checkpoints,
            visited: HashSet::new(),
            cursor: 0,
            phase: SessionPhase::Idle,
            answers: Vec::new(),
            pending_flush: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn checkpoints(&self) -> &CheckpointSet {
        &self.checkpoints
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn entries(&self) -> &[AnswerEntry] {
        &self.answers
    }

    pub fn playback_started(&mut self) {
        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::Playing;
        }
    }

    pub fn playback_stopped(&mut self) {
        if self.phase == SessionPhase::Playing {
            self.phase = SessionPhase::Idle;
        }
    }

    /// Evaluate one playback sample against the checkpoint at the cursor.
    ///
    /// Triggers when the sample is at or past that checkpoint's timestamp and
    /// its index has not been visited. The cursor advances by exactly one per
    /// trigger and never re-scans skipped indices, so a forward seek past
    /// several unvisited checkpoints presents only the earliest one (late),
    /// and a backward seek never re-arms a visited index.
    pub fn sample(&mut self, position: f64) -> Option<usize> {
        if !matches!(self.phase, SessionPhase::Idle | SessionPhase::Playing) {
            return None;
        }
        let next = self.checkpoints.get(self.cursor)?;
        if position < next.timestamp || self.visited.contains(&self.cursor) {
            return None;
        }

        let index = self.cursor;
        self.visited.insert(index);
        self.cursor += 1;
        self.phase = SessionPhase::Presenting(index);
        Some(index)
    }

    /// True when `index` is the last checkpoint; this is what switches the
    /// terminal submit into the flush path.
    pub fn is_terminal(&self, index: usize) -> bool {
        !self.checkpoints.is_empty() && index == self.checkpoints.len() - 1
    }

    /// Enter the submitting phase. Rejects re-entrant submits while one is
    /// in flight (the UI's disable-on-click discipline, as a phase guard).
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, SessionError> {
        match self.phase {
            SessionPhase::Presenting(index) => {
                self.phase = SessionPhase::Submitting(index);
                Ok(SubmitTicket {
                    index,
                    retry: self.pending_flush,
                })
            }
            SessionPhase::Submitting(_) => Err(SessionError::SubmitInFlight),
            _ => Err(SessionError::NoActiveCheckpoint),
        }
    }

    /// Append a collected entry to the session accumulator.
    pub fn record(&mut self, entry: AnswerEntry) {
        self.answers.push(entry);
    }

    /// Non-terminal submit completed; resume playback.
    pub fn submit_finished(&mut self) {
        if let SessionPhase::Submitting(_) = self.phase {
            self.phase = SessionPhase::Playing;
        }
    }

    /// Terminal flush delivered; the accumulator is cleared.
    pub fn flush_succeeded(&mut self) {
        if let SessionPhase::Submitting(_) = self.phase {
            self.answers.clear();
            self.pending_flush = false;
            self.phase = SessionPhase::Playing;
        }
    }

    /// Terminal flush failed; keep the accumulator and re-present the
    /// checkpoint so the operator can retry. The retry re-flushes without
    /// collecting a duplicate entry.
    pub fn flush_failed(&mut self) {
        if let SessionPhase::Submitting(index) = self.phase {
            self.pending_flush = true;
            self.phase = SessionPhase::Presenting(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{Checkpoint, CheckpointKind};

    fn text(id: &str, timestamp: f64) -> Checkpoint {
        Checkpoint {
            timestamp,
            id: id.to_string(),
            kind: CheckpointKind::Text {
                question: format!("question {id}"),
            },
        }
    }

    fn session(checkpoints: Vec<Checkpoint>) -> SurveySession {
        let mut session = SurveySession::new("session_test".to_string(), CheckpointSet::new(checkpoints));
        session.playback_started();
        session
    }

    fn entry_for(session: &SurveySession, index: usize) -> AnswerEntry {
        AnswerEntry {
            session_id: session.key().to_string(),
            question_id: format!("q{index}"),
            checkpoint_index: index,
            video_time: 0.0,
            answer: String::new(),
            ratings: Default::default(),
        }
    }

    #[test]
    fn unsorted_input_is_evaluated_in_timestamp_order() {
        let mut session = session(vec![text("late", 30.0), text("early", 10.0)]);

        let index = session.sample(12.0).unwrap();
        assert_eq!(index, 0);
        assert_eq!(session.checkpoints().get(index).unwrap().id, "early");
    }

    #[test]
    fn checkpoint_triggers_at_most_once() {
        let mut session = session(vec![text("a", 10.0)]);

        assert_eq!(session.sample(5.0), None);
        assert_eq!(session.sample(10.0), Some(0));

        // Finish the submit cycle, then replay samples around the timestamp.
        session.begin_submit().unwrap();
        session.submit_finished();
        assert_eq!(session.sample(10.0), None);
        assert_eq!(session.sample(8.0), None);
        assert_eq!(session.sample(15.0), None);
        assert_eq!(session.visited_count(), 1);
    }

    #[test]
    fn cursor_never_decreases_after_backward_seek() {
        let mut session = session(vec![text("a", 10.0), text("b", 20.0)]);

        assert_eq!(session.sample(11.0), Some(0));
        session.begin_submit().unwrap();
        session.submit_finished();
        assert_eq!(session.cursor(), 1);

        // Backward seek: samples before the visited checkpoint change nothing.
        assert_eq!(session.sample(2.0), None);
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.sample(20.0), Some(1));
        assert_eq!(session.cursor(), 2);
    }

    #[test]
    fn forward_seek_presents_only_the_cursor_checkpoint() {
        let mut session = session(vec![text("a", 10.0), text("b", 20.0)]);

        // Post-seek sample far past both checkpoints: only the first fires,
        // and the cursor has advanced exactly one step.
        assert_eq!(session.sample(25.0), Some(0));
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.phase(), SessionPhase::Presenting(0));

        // No further trigger while presenting.
        assert_eq!(session.sample(25.0), None);
    }

    #[test]
    fn terminal_detection_is_last_index_only() {
        let session = session(vec![text("a", 10.0), text("b", 20.0), text("c", 30.0)]);
        assert!(!session.is_terminal(0));
        assert!(!session.is_terminal(1));
        assert!(session.is_terminal(2));
    }

    #[test]
    fn begin_submit_rejects_reentry() {
        let mut session = session(vec![text("a", 10.0)]);
        session.sample(10.0).unwrap();

        let ticket = session.begin_submit().unwrap();
        assert_eq!(ticket.index, 0);
        assert!(!ticket.retry);
        assert_eq!(session.begin_submit().unwrap_err(), SessionError::SubmitInFlight);
    }

    #[test]
    fn begin_submit_requires_presentation() {
        let mut session = session(vec![text("a", 10.0)]);
        assert_eq!(
            session.begin_submit().unwrap_err(),
            SessionError::NoActiveCheckpoint
        );
    }

    #[test]
    fn flush_failure_keeps_accumulator_and_marks_retry() {
        let mut session = session(vec![text("a", 10.0)]);
        session.sample(10.0).unwrap();
        session.begin_submit().unwrap();
        let entry = entry_for(&session, 0);
        session.record(entry);
        session.flush_failed();

        assert_eq!(session.phase(), SessionPhase::Presenting(0));
        assert_eq!(session.entries().len(), 1);

        // The retry ticket flags that collection already happened.
        let ticket = session.begin_submit().unwrap();
        assert!(ticket.retry);

        session.flush_succeeded();
        assert!(session.entries().is_empty());
        assert_eq!(session.phase(), SessionPhase::Playing);
    }

    #[test]
    fn session_keys_are_unique_per_viewing() {
        let a = new_session_key();
        let b = new_session_key();
        assert!(a.starts_with("session_"));
        assert_ne!(a, b);
    }
}
