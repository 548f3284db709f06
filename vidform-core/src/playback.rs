//! Playback source capability — the embedded video player seam.
//!
//! The runtime never talks to a concrete player SDK; it only needs position,
//! duration, state and the play/pause/seek commands. Error codes from the
//! player's error channel map onto the known unplayable-video conditions.

use thiserror::Error;

/// Player state as reported by the embedded player's state codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PlayerState::Ended,
            1 => PlayerState::Playing,
            2 => PlayerState::Paused,
            3 => PlayerState::Buffering,
            5 => PlayerState::Cued,
            _ => PlayerState::Unstarted,
        }
    }

    pub fn is_playing(self) -> bool {
        matches!(self, PlayerState::Playing)
    }
}

/// Fatal playback conditions, each carrying its user-visible message.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("The video could not be found. Please check the video id.")]
    NotFound,

    #[error("This video cannot be played in an embedded player. The video owner has restricted it.")]
    OwnerRestricted,

    #[error("This video does not allow embedded playback.")]
    NotEmbeddable,

    #[error("An error occurred with the video player. Error code: {0}")]
    Player(u16),
}

impl PlaybackError {
    pub fn from_code(code: u16) -> Self {
        match code {
            100 => PlaybackError::NotFound,
            150 => PlaybackError::OwnerRestricted,
            101 | 153 => PlaybackError::NotEmbeddable,
            other => PlaybackError::Player(other),
        }
    }
}

/// Handle to a playback source.
pub trait PlaybackSource: Send + Sync {
    /// Current position in seconds.
    fn position(&self) -> f64;

    /// Total duration in seconds, `None` until the player knows it.
    fn duration(&self) -> Option<f64>;

    fn state(&self) -> PlayerState;

    fn play(&mut self);

    fn pause(&mut self);

    fn seek_to(&mut self, seconds: f64);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    pub struct FakeState {
        pub position: f64,
        pub duration: Option<f64>,
        pub state: PlayerState,
        pub pauses: usize,
        pub plays: usize,
        pub seeks: Vec<f64>,
    }

    /// Scripted playback source; the test body keeps a clone to script
    /// positions and observe issued commands.
    #[derive(Clone, Default)]
    pub struct FakePlayer(pub Arc<Mutex<FakeState>>);

    impl FakePlayer {
        pub fn with_duration(duration: f64) -> Self {
            let player = Self::default();
            player.0.lock().unwrap().duration = Some(duration);
            player
        }

        pub fn set_position(&self, position: f64) {
            self.0.lock().unwrap().position = position;
        }

        pub fn set_state(&self, state: PlayerState) {
            self.0.lock().unwrap().state = state;
        }

        pub fn pauses(&self) -> usize {
            self.0.lock().unwrap().pauses
        }

        pub fn plays(&self) -> usize {
            self.0.lock().unwrap().plays
        }
    }

    impl PlaybackSource for FakePlayer {
        fn position(&self) -> f64 {
            self.0.lock().unwrap().position
        }

        fn duration(&self) -> Option<f64> {
            self.0.lock().unwrap().duration
        }

        fn state(&self) -> PlayerState {
            self.0.lock().unwrap().state
        }

        fn play(&mut self) {
            let mut state = self.0.lock().unwrap();
            state.state = PlayerState::Playing;
            state.plays += 1;
        }

        fn pause(&mut self) {
            let mut state = self.0.lock().unwrap();
            state.state = PlayerState::Paused;
            state.pauses += 1;
        }

        fn seek_to(&mut self, seconds: f64) {
            let mut state = self.0.lock().unwrap();
            state.position = seconds;
            state.seeks.push(seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_map() {
        assert_eq!(PlayerState::from_code(1), PlayerState::Playing);
        assert_eq!(PlayerState::from_code(2), PlayerState::Paused);
        assert_eq!(PlayerState::from_code(-1), PlayerState::Unstarted);
        assert!(PlayerState::from_code(1).is_playing());
        assert!(!PlayerState::from_code(3).is_playing());
    }

    #[test]
    fn error_codes_map_to_distinguished_messages() {
        assert_eq!(PlaybackError::from_code(100), PlaybackError::NotFound);
        assert_eq!(PlaybackError::from_code(150), PlaybackError::OwnerRestricted);
        assert_eq!(PlaybackError::from_code(101), PlaybackError::NotEmbeddable);
        assert_eq!(PlaybackError::from_code(153), PlaybackError::NotEmbeddable);
        assert_eq!(PlaybackError::from_code(5), PlaybackError::Player(5));

        let msg = PlaybackError::from_code(2).to_string();
        assert!(msg.contains("Error code: 2"));
    }
}
