use config::{Config, ConfigError, File};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize, Clone)]
pub struct VidformConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlaybackConfig {
    /// Sampling cadence of the playback monitor while the video plays.
    pub sample_interval_ms: u64,
    /// Delay between duration probes when the player does not know its
    /// duration yet.
    pub duration_retry_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 500,
            duration_retry_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// One answer per submit, delivered to the database API immediately.
    Incremental,
    /// Everything held until the terminal checkpoint, then one form post.
    Batch,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    pub mode: SubmissionMode,
    /// Base URL of the database API (incremental mode).
    pub api_base_url: Option<String>,
    /// Third-party form collection endpoint (batch mode).
    pub form_endpoint_url: Option<String>,
    /// Form the session's answers belong to (incremental mode).
    pub form_id: Option<Uuid>,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            mode: SubmissionMode::Incremental,
            api_base_url: Some("http://127.0.0.1:8090".to_string()),
            form_endpoint_url: None,
            form_id: None,
        }
    }
}

impl VidformConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        s.try_deserialize()
    }
}
