//! Error types for Synheart Bloom

use thiserror::Error;

/// Errors that can occur during scoring, aggregation, or persistence
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid telemetry: {0}")]
    InvalidTelemetry(String),

    #[error("Invalid month: {0}")]
    InvalidMonth(String),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Diary analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Store error: {0}")]
    StoreError(String),
}
