pub mod checkpoint;
pub mod collector;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod monitor;
pub mod playback;
pub mod session;
pub mod sink;
pub mod surface;
pub mod timeline;

pub use checkpoint::{Checkpoint, CheckpointKind, CheckpointSet};
pub use collector::{answers_to_csv, batch_fields, AnswerEntry};
pub use config::VidformConfig;
pub use error::VidformError;
pub use monitor::{SubmitOutcome, SurveyRuntime, WidgetEvent};
pub use playback::{PlaybackError, PlaybackSource, PlayerState};
pub use session::{new_session_key, SessionPhase, SurveySession};
pub use sink::{create_sink, Delivery, FormEndpointSink, ResponseApiSink, SubmissionSink};
pub use surface::FormSurface;
pub use timeline::Timeline;
