use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ============= Engine Types =============

/// A single viewpoint's answer to the user's query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WorkerResponse {
    /// Label of the viewpoint that produced this answer
    pub perspective: String,
    /// The answer text
    pub content: String,
}

impl WorkerResponse {
    /// Create a new response for the given perspective.
    pub fn new(perspective: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            perspective: perspective.into(),
            content: content.into(),
        }
    }

    /// A response is only usable when it carries non-blank content.
    pub fn is_valid(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// The synthesized outcome of one deliberation.
///
/// Field aliases accept the legacy names some prompts still elicit
/// from the mediator model (`contradictions`, `political_parties`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct AggregateResult {
    /// Neutral summary of the main points across all perspectives
    pub summary: String,
    /// Explicit disagreements between perspectives, empty when none
    #[serde(alias = "contradictions")]
    pub conflicts: String,
    /// Every perspective that contributed to the summary
    #[serde(alias = "political_parties")]
    pub perspectives: Vec<String>,
}

/// Which synthesis path produced the final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisPath {
    /// The structured generator call succeeded
    Strict,
    /// Raw text was repaired after the structured call failed
    Fallback,
}

impl SynthesisPath {
    /// Lowercase name used in logs and API output.
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisPath::Strict => "strict",
            SynthesisPath::Fallback => "fallback",
        }
    }
}

/// Why a worker did not contribute a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// `produce` returned an error
    Error(String),
    /// The shared dispatch deadline elapsed first
    Timeout,
    /// The worker task panicked
    Panicked(String),
    /// The worker answered with blank content
    EmptyContent,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Error(e) => write!(f, "error: {}", e),
            FailureReason::Timeout => write!(f, "timed out"),
            FailureReason::Panicked(msg) => write!(f, "panicked: {}", msg),
            FailureReason::EmptyContent => write!(f, "empty content"),
        }
    }
}

/// Record of a worker that produced no usable response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerFailure {
    /// Registry key of the worker
    pub worker: String,
    /// Perspective label of the worker
    pub perspective: String,
    /// What went wrong
    pub reason: FailureReason,
}

/// Full record of one deliberation, as returned by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deliberation {
    pub trace_id: Uuid,
    pub query: String,
    pub result: AggregateResult,
    pub responses: Vec<WorkerResponse>,
    pub failures: Vec<WorkerFailure>,
    pub synthesis_path: SynthesisPath,
    /// True when the generator's perspective list had to be replaced
    pub corrected: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversationRequest {
    /// The question to deliberate on
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Explicit worker keys; skips routing when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perspectives: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub summary: String,
    pub conflicts: String,
    pub perspectives: Vec<String>,
    pub trace_id: Uuid,
    #[schema(value_type = Vec<Object>)]
    pub failed_workers: Vec<WorkerFailure>,
    pub synthesis_path: SynthesisPath,
    pub corrected: bool,
    pub duration_ms: u64,
}

impl From<Deliberation> for ConversationResponse {
    fn from(d: Deliberation) -> Self {
        Self {
            summary: d.result.summary,
            conflicts: d.result.conflicts,
            perspectives: d.result.perspectives,
            trace_id: d.trace_id,
            failed_workers: d.failures,
            synthesis_path: d.synthesis_path,
            corrected: d.corrected,
            duration_ms: d.duration_ms,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PerspectiveInfo {
    pub key: String,
    pub label: String,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unknown worker: {0}")]
    UnknownWorker(String),

    #[error("Worker already registered: {0}")]
    DuplicateWorker(String),

    #[error("Worker '{worker}' failed: {reason}")]
    WorkerInvocationFailed { worker: String, reason: String },

    #[error("Unable to produce a result: no valid responses from any perspective")]
    NoValidResponses,

    #[error("Synthesized perspectives {found:?} do not match responding perspectives {expected:?}")]
    SynthesisValidationMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Structured synthesis output could not be parsed: {0}")]
    SynthesisParseFailed(String),

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::UnknownWorker(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NoValidResponses | AppError::SynthesisFailed(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_response_validity() {
        assert!(WorkerResponse::new("Liberal", "Expand coverage.").is_valid());
        assert!(!WorkerResponse::new("Liberal", "").is_valid());
        assert!(!WorkerResponse::new("Liberal", "  \n\t").is_valid());
    }

    #[test]
    fn test_aggregate_accepts_legacy_field_names() {
        let json = r#"{
            "summary": "s",
            "contradictions": "c",
            "political_parties": ["Conservative", "Liberal"]
        }"#;
        let parsed: AggregateResult = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.conflicts, "c");
        assert_eq!(parsed.perspectives, vec!["Conservative", "Liberal"]);
    }

    #[test]
    fn test_aggregate_serializes_canonical_names() {
        let result = AggregateResult {
            summary: "s".to_string(),
            conflicts: String::new(),
            perspectives: vec!["Socialist".to_string()],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("conflicts").is_some());
        assert!(value.get("perspectives").is_some());
        assert!(value.get("political_parties").is_none());
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(FailureReason::Timeout.to_string(), "timed out");
        assert_eq!(
            FailureReason::Error("boom".to_string()).to_string(),
            "error: boom"
        );
    }

    #[test]
    fn test_failure_reason_serialization() {
        let value = serde_json::to_value(FailureReason::Error("x".to_string())).unwrap();
        assert_eq!(value["kind"], "error");
        assert_eq!(value["detail"], "x");

        let value = serde_json::to_value(FailureReason::Timeout).unwrap();
        assert_eq!(value["kind"], "timeout");
    }

    #[test]
    fn test_error_status_codes() {
        use axum::http::StatusCode;
        use axum::response::IntoResponse;

        let cases = [
            (AppError::NoValidResponses, StatusCode::BAD_GATEWAY),
            (AppError::SynthesisFailed("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (AppError::UnknownWorker("x".into()), StatusCode::NOT_FOUND),
            (AppError::LLM("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_synthesis_path_names() {
        assert_eq!(SynthesisPath::Strict.as_str(), "strict");
        assert_eq!(
            serde_json::to_value(SynthesisPath::Fallback).unwrap(),
            "fallback"
        );
    }
}
