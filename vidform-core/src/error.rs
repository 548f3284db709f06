use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::playback::PlaybackError;
use crate::sink::SubmitError;

#[derive(Error, Debug)]
pub enum VidformError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),

    #[error("Other error: {0}")]
    Other(String),
}
