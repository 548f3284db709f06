//! vidform-cli — inspect forms and export survey responses
//!
//! Thin frontend for the Vidform HTTP API.
//!
//! # Subcommands
//! - `forms`                       — list forms
//! - `form <id>`                   — show one form with its questions
//! - `responses <form-id> [--json]`— list a form's responses
//! - `export <form-id>`            — responses flattened to CSV on stdout
//! - `status`                      — show server health

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8090";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "vidform-cli",
    version,
    about = "Vidform survey API frontend"
)]
struct Cli {
    /// Vidform HTTP server URL (overrides VIDFORM_HTTP_URL env var)
    #[arg(long, env = "VIDFORM_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List all forms
    Forms,

    /// Show one form with its questions
    Form {
        /// Form id (UUID)
        id: String,
    },

    /// List a form's responses with nested answers
    Responses {
        /// Form id (UUID)
        form_id: String,

        /// Print the raw JSON payload
        #[arg(long)]
        json: bool,
    },

    /// Flatten a form's responses to CSV on stdout
    Export {
        /// Form id (UUID)
        form_id: String,
    },

    /// Show Vidform server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FormSummary {
    pub id: String,
    pub title: String,
    pub youtube_video_id: String,
    pub is_published: bool,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FormsEnvelope {
    #[serde(default)]
    forms: Vec<FormSummary>,
}

#[derive(Debug, Deserialize)]
struct FormEnvelope {
    form: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct AnswerDto {
    pub question_id: String,
    pub answer_data: serde_json::Value,
    pub video_timestamp: Option<f64>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseDto {
    pub session_id: String,
    pub created_at: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnswerDto>,
}

#[derive(Debug, Deserialize)]
struct ResponsesEnvelope {
    #[serde(default)]
    responses: Vec<ResponseDto>,
}

// ============================================================================
// CSV Export
// ============================================================================

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

/// Flatten nested responses into one CSV line per answer.
pub fn responses_to_csv(responses: &[ResponseDto]) -> String {
    let mut lines = vec!["session_id,question_id,video_timestamp,answer,submitted_at".to_string()];

    for response in responses {
        for answer in &response.answers {
            let answer_text = answer.answer_data["answer"]
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| answer.answer_data["answer"].to_string());
            let row = [
                response.session_id.clone(),
                answer.question_id.clone(),
                answer
                    .video_timestamp
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                answer_text,
                answer.created_at.clone().unwrap_or_default(),
            ];
            lines.push(
                row.iter()
                    .map(|cell| csv_escape(cell))
                    .collect::<Vec<_>>()
                    .join(","),
            );
        }
    }

    lines.join("\n")
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}

fn fetch_json(url: &str) -> anyhow::Result<serde_json::Value> {
    let resp = match client()?.get(url).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("vidform-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("vidform-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    Ok(resp.json()?)
}

fn do_forms(server: &str) -> anyhow::Result<()> {
    let value = fetch_json(&format!("{}/api/forms", server))?;
    let envelope: FormsEnvelope = serde_json::from_value(value)?;

    if envelope.forms.is_empty() {
        eprintln!("No forms found");
        return Ok(());
    }

    for form in &envelope.forms {
        let published = if form.is_published { "published" } else { "draft" };
        println!(
            "{}  {}  [{}]  video={}  created={}",
            form.id,
            form.title,
            published,
            form.youtube_video_id,
            form.created_at.as_deref().unwrap_or("?")
        );
    }
    Ok(())
}

fn do_form(server: &str, id: &str) -> anyhow::Result<()> {
    let value = fetch_json(&format!("{}/api/forms/{}", server, id))?;
    let envelope: FormEnvelope = serde_json::from_value(value)?;
    println!("{}", serde_json::to_string_pretty(&envelope.form)?);
    Ok(())
}

fn do_responses(server: &str, form_id: &str, json_output: bool) -> anyhow::Result<()> {
    let value = fetch_json(&format!("{}/api/responses/form/{}", server, form_id))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let envelope: ResponsesEnvelope = serde_json::from_value(value)?;
    if envelope.responses.is_empty() {
        eprintln!("No responses found for form {}", form_id);
        return Ok(());
    }

    for response in &envelope.responses {
        println!(
            "{}  started={}  answers={}",
            response.session_id,
            response.created_at.as_deref().unwrap_or("?"),
            response.answers.len()
        );
        for answer in &response.answers {
            let at = answer
                .video_timestamp
                .map(|t| format!("{t}s"))
                .unwrap_or_else(|| "?".to_string());
            println!(
                "  {} @ {}: {}",
                answer.question_id, at, answer.answer_data["answer"]
            );
        }
    }
    Ok(())
}

fn do_export(server: &str, form_id: &str) -> anyhow::Result<()> {
    let value = fetch_json(&format!("{}/api/responses/form/{}", server, form_id))?;
    let envelope: ResponsesEnvelope = serde_json::from_value(value)?;
    println!("{}", responses_to_csv(&envelope.responses));
    Ok(())
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/api/health", server);
    let resp = client()?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Vidform server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:        {}", body["version"].as_str().unwrap_or("?"));
            println!("Database:       {}", body["database"].as_str().unwrap_or("?"));
            println!("PostgreSQL:     {}", body["postgresql"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("vidform-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("vidform-cli: cannot reach {} — {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Forms => do_forms(&server),
        Commands::Form { id } => do_form(&server, &id),
        Commands::Responses { form_id, json } => do_responses(&server, &form_id, json),
        Commands::Export { form_id } => do_export(&server, &form_id),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("vidform-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(question_id: &str, text: &str, at: Option<f64>) -> AnswerDto {
        AnswerDto {
            question_id: question_id.to_string(),
            answer_data: serde_json::json!({ "answer": text }),
            video_timestamp: at,
            created_at: Some("2026-08-01T10:00:00Z".to_string()),
        }
    }

    #[test]
    fn csv_escape_quotes_when_needed() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn responses_flatten_to_one_line_per_answer() {
        let responses = vec![ResponseDto {
            session_id: "session_a".to_string(),
            created_at: None,
            answers: vec![
                answer("q1", "4", Some(12.0)),
                answer("q2", "ship, it", Some(31.5)),
            ],
        }];

        let csv = responses_to_csv(&responses);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "session_id,question_id,video_timestamp,answer,submitted_at"
        );
        assert_eq!(lines[1], "session_a,q1,12,4,2026-08-01T10:00:00Z");
        assert_eq!(
            lines[2],
            "session_a,q2,31.5,\"ship, it\",2026-08-01T10:00:00Z"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn non_string_answers_serialize_raw() {
        let responses = vec![ResponseDto {
            session_id: "session_b".to_string(),
            created_at: None,
            answers: vec![AnswerDto {
                question_id: "q1".to_string(),
                answer_data: serde_json::json!({ "answer": 5 }),
                video_timestamp: None,
                created_at: None,
            }],
        }];

        let csv = responses_to_csv(&responses);
        assert!(csv.lines().nth(1).unwrap().contains(",5,"));
    }

    #[test]
    fn empty_responses_produce_header_only() {
        assert_eq!(
            responses_to_csv(&[]),
            "session_id,question_id,video_timestamp,answer,submitted_at"
        );
    }
}
