//! Timeline view projection.
//!
//! Pure derivation of progress, marker and label state from playback
//! position and checkpoint completion; no decisions are made here.

use crate::checkpoint::CheckpointSet;

/// Render seconds as `m:ss` (floored, zero-padded seconds).
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineMarker {
    /// Horizontal position on the track, percent, clamped to 100.
    pub position_pct: f64,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct Timeline {
    duration: f64,
    position: f64,
    markers: Vec<TimelineMarker>,
}

impl Timeline {
    pub fn build(checkpoints: &CheckpointSet, duration: f64) -> Self {
        let markers = checkpoints
            .iter()
            .map(|checkpoint| TimelineMarker {
                position_pct: (checkpoint.timestamp / duration * 100.0).min(100.0),
                completed: false,
            })
            .collect();
        Self {
            duration,
            position: 0.0,
            markers,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn markers(&self) -> &[TimelineMarker] {
        &self.markers
    }

    pub fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    pub fn mark_completed(&mut self, index: usize) {
        if let Some(marker) = self.markers.get_mut(index) {
            marker.completed = true;
        }
    }

    pub fn answered(&self) -> usize {
        self.markers.iter().filter(|m| m.completed).count()
    }

    /// Watched fraction as a percentage, clamped to 100.
    pub fn progress_pct(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.position / self.duration * 100.0).min(100.0)
    }

    pub fn watched_label(&self) -> String {
        format!("Watched: {}", format_time(self.position))
    }

    pub fn questions_label(&self) -> String {
        format!("Questions: {} / {}", self.answered(), self.markers.len())
    }

    /// Map a click on the track to a playback position; the fraction is
    /// clamped so clicks outside the track edges land on the ends.
    pub fn seek_target(&self, click_x: f64, track_width: f64) -> f64 {
        let width = if track_width > 0.0 { track_width } else { 1.0 };
        (click_x / width).clamp(0.0, 1.0) * self.duration
    }
}
