// Caller-facing pipeline errors
use serde_json::{json, Value};
use thiserror::Error;

use crate::observer::error::{codes, ValidationError};
use crate::storage::StorageError;

pub const RECURSION_ERROR: &str = "RECURSION_ERROR";
pub const SYSTEM_ERROR: &str = "SYSTEM_ERROR";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";

/// Structured failure returned by `ObserverPipeline::run`
#[derive(Debug, Error)]
pub enum PipelineError {
    /// One or more violations were collected
    ///
    /// Violations from rings 0-5 mean nothing was persisted. Violations raised
    /// by rings 6-9 arrive after the batch was already written.
    #[error("{primary_message}")]
    Validation {
        primary_message: String,
        primary_code: String,
        violations: Vec<ValidationError>,
    },

    #[error("Observer recursion error: depth {depth} exceeds maximum {max_depth}")]
    Recursion { depth: usize, max_depth: usize },

    /// Unresolvable model or invalid pipeline state
    #[error("System error: {0}")]
    System(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// Collapse a violation list into one error keyed by the first violation
    pub fn from_violations(violations: Vec<ValidationError>) -> Self {
        let (primary_message, primary_code) = match violations.first() {
            Some(first) => (first.message.clone(), first.code.clone()),
            None => ("Validation failed".to_string(), codes::VALIDATION_ERROR.to_string()),
        };
        PipelineError::Validation {
            primary_message,
            primary_code,
            violations,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            PipelineError::Validation { primary_code, .. } => primary_code,
            PipelineError::Recursion { .. } => RECURSION_ERROR,
            PipelineError::System(_) => SYSTEM_ERROR,
            PipelineError::Storage(_) => STORAGE_ERROR,
        }
    }

    /// HTTP-equivalent status so front ends can map 4xx vs 5xx
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::Validation { primary_code, .. } => match primary_code.as_str() {
                codes::RECORD_NOT_FOUND => 404,
                codes::OBSERVER_ERROR | codes::OBSERVER_TIMEOUT => 500,
                _ => 422,
            },
            PipelineError::Recursion { .. } => 500,
            PipelineError::System(_) => 500,
            PipelineError::Storage(e) => e.status_code(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn violations(&self) -> &[ValidationError] {
        match self {
            PipelineError::Validation { violations, .. } => violations,
            _ => &[],
        }
    }

    /// Error body in the shape front ends return to clients
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.to_string(),
            "error_code": self.code(),
            "violations": self.violations(),
        })
    }
}
