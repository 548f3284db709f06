//! Submission sinks — delivery of collected answers to an external
//! destination.
//!
//! Two interchangeable implementations behind one trait:
//! - `ResponseApiSink` (incremental): every submit posts one answer to the
//!   database API; the terminal flush is a no-op.
//! - `FormEndpointSink` (batch): per-answer delivery is a no-op; the terminal
//!   flush posts the whole accumulated set as one multipart form.
//!
//! No client-side timeout is set on the submission call; it rides on the
//! transport's own timeout behavior, and there is no cancellation for an
//! in-flight submission.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::collector::{batch_fields, AnswerEntry};
use crate::config::{SubmissionConfig, SubmissionMode};

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("submission destination is not configured")]
    NotConfigured,
}

/// Per-answer delivery result, surfaced to the caller instead of being
/// dropped with a rejected future. The incremental policy stays
/// continue-anyway, but it is now an explicit choice at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed(String),
}

#[async_trait]
pub trait SubmissionSink: Send + Sync + std::fmt::Debug {
    /// Deliver one freshly collected entry. Batch sinks hold it in the
    /// session accumulator until `flush`.
    async fn deliver(&self, entry: &AnswerEntry) -> Result<(), SubmitError>;

    /// Deliver the accumulated set at the terminal checkpoint.
    async fn flush(&self, session_id: &str, entries: &[AnswerEntry]) -> Result<(), SubmitError>;

    /// Sink name for logging.
    fn name(&self) -> &str;
}

/// Pick the sink variant from configuration.
pub fn create_sink(config: &SubmissionConfig) -> Result<Box<dyn SubmissionSink>, SubmitError> {
    match config.mode {
        SubmissionMode::Incremental => {
            let base_url = config
                .api_base_url
                .as_deref()
                .ok_or(SubmitError::NotConfigured)?;
            let form_id = config.form_id.ok_or(SubmitError::NotConfigured)?;
            Ok(Box::new(ResponseApiSink::new(base_url, form_id)?))
        }
        SubmissionMode::Batch => {
            let endpoint = config
                .form_endpoint_url
                .as_deref()
                .ok_or(SubmitError::NotConfigured)?;
            Ok(Box::new(FormEndpointSink::new(endpoint)?))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

// ============================================================================
// ResponseApiSink — incremental delivery to the database API
// ============================================================================

/// Posts each answer to `POST {base}/api/responses` as it is collected. The
/// server creates or reuses the response row for `(form_id, session_id)`.
#[derive(Debug)]
pub struct ResponseApiSink {
    client: Client,
    base_url: String,
    form_id: Uuid,
}

impl ResponseApiSink {
    pub fn new(base_url: impl Into<String>, form_id: Uuid) -> Result<Self, SubmitError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            form_id,
        })
    }
}

#[async_trait]
impl SubmissionSink for ResponseApiSink {
    async fn deliver(&self, entry: &AnswerEntry) -> Result<(), SubmitError> {
        let url = format!("{}/api/responses", self.base_url);
        let body = serde_json::json!({
            "form_id": self.form_id,
            "question_id": entry.question_id,
            "session_id": entry.session_id,
            "answer_data": { "answer": entry.answer },
            "video_timestamp": entry.video_time,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SubmitError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ResponseEnvelope = response.json().await?;
        if !envelope.success {
            return Err(SubmitError::Api {
                status: status.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(())
    }

    async fn flush(&self, _session_id: &str, _entries: &[AnswerEntry]) -> Result<(), SubmitError> {
        // Answers were delivered one at a time; nothing is held back.
        Ok(())
    }

    fn name(&self) -> &str {
        "response-api"
    }
}

// ============================================================================
// FormEndpointSink — batch delivery to a third-party form endpoint
// ============================================================================

/// Holds nothing itself; at the terminal checkpoint the session's accumulated
/// entries are flattened into one multipart form post.
#[derive(Debug)]
pub struct FormEndpointSink {
    client: Client,
    endpoint: String,
}

impl FormEndpointSink {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SubmitError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SubmissionSink for FormEndpointSink {
    async fn deliver(&self, _entry: &AnswerEntry) -> Result<(), SubmitError> {
        // Held in the session accumulator until the terminal flush.
        Ok(())
    }

    async fn flush(&self, session_id: &str, entries: &[AnswerEntry]) -> Result<(), SubmitError> {
        let mut form = reqwest::multipart::Form::new().text("session_id", session_id.to_string());
        for (name, value) in batch_fields(entries) {
            form = form.text(name, value);
        }

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SubmitError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "form-endpoint"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(question_id: &str, answer: &str, ratings: &[(&str, &str)]) -> AnswerEntry {
        AnswerEntry {
            session_id: "session_abc".to_string(),
            question_id: question_id.to_string(),
            checkpoint_index: 0,
            video_time: 12.0,
            answer: answer.to_string(),
            ratings: ratings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn response_api_sink_posts_one_answer() {
        let server = MockServer::start().await;
        let form_id = Uuid::new_v4();
        let sink = ResponseApiSink::new(server.uri(), form_id).unwrap();

        Mock::given(method("POST"))
            .and(path("/api/responses"))
            .and(body_partial_json(serde_json::json!({
                "form_id": form_id,
                "question_id": "q1",
                "session_id": "session_abc",
                "answer_data": { "answer": "hello" },
                "video_timestamp": 12.0,
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": true, "answer": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        sink.deliver(&entry("q1", "hello", &[])).await.unwrap();
    }

    #[tokio::test]
    async fn response_api_sink_maps_error_envelope() {
        let server = MockServer::start().await;
        let sink = ResponseApiSink::new(server.uri(), Uuid::new_v4()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"success": false, "error": "Failed to save response"}),
            ))
            .mount(&server)
            .await;

        let err = sink.deliver(&entry("q1", "hello", &[])).await.unwrap_err();
        match err {
            SubmitError::Api { status, message } => {
                assert_eq!(status, 200);
                assert_eq!(message, "Failed to save response");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn response_api_sink_maps_http_error_status() {
        let server = MockServer::start().await;
        let sink = ResponseApiSink::new(server.uri(), Uuid::new_v4()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = sink.deliver(&entry("q1", "hello", &[])).await.unwrap_err();
        assert!(matches!(err, SubmitError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn form_endpoint_sink_flushes_multipart_fields() {
        let server = MockServer::start().await;
        let sink = FormEndpointSink::new(format!("{}/s/test", server.uri())).unwrap();

        Mock::given(method("POST"))
            .and(path("/s/test"))
            .and(body_string_contains("session_id"))
            .and(body_string_contains("session_abc"))
            .and(body_string_contains("q1_answer"))
            .and(body_string_contains("q1_rating_find_prices"))
            .and(body_string_contains("love_it"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let entries = vec![entry(
            "q1",
            "more please",
            &[("rating_q1_find_prices", "love_it")],
        )];
        sink.flush("session_abc", &entries).await.unwrap();
    }

    #[tokio::test]
    async fn form_endpoint_sink_treats_http_error_as_flush_failure() {
        let server = MockServer::start().await;
        let sink = FormEndpointSink::new(format!("{}/s/test", server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = sink
            .flush("session_abc", &[entry("q1", "a", &[])])
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn form_endpoint_sink_deliver_is_a_no_op() {
        // No mock mounted: a real request would fail, a no-op succeeds.
        let sink = FormEndpointSink::new("http://127.0.0.1:9/unused").unwrap();
        sink.deliver(&entry("q1", "a", &[])).await.unwrap();
    }

    #[test]
    fn create_sink_requires_destination_config() {
        let incomplete = SubmissionConfig {
            mode: SubmissionMode::Batch,
            api_base_url: None,
            form_endpoint_url: None,
            form_id: None,
        };
        assert!(matches!(
            create_sink(&incomplete).unwrap_err(),
            SubmitError::NotConfigured
        ));

        let batch = SubmissionConfig {
            mode: SubmissionMode::Batch,
            api_base_url: None,
            form_endpoint_url: Some("https://example.test/s/abc".to_string()),
            form_id: None,
        };
        assert_eq!(create_sink(&batch).unwrap().name(), "form-endpoint");

        let incremental = SubmissionConfig {
            mode: SubmissionMode::Incremental,
            api_base_url: Some("http://127.0.0.1:8090".to_string()),
            form_endpoint_url: None,
            form_id: Some(Uuid::new_v4()),
        };
        assert_eq!(create_sink(&incremental).unwrap().name(), "response-api");
    }
}
