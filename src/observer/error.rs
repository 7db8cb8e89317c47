use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::error::PipelineError;
use crate::observer::model_record::ModelRecord;
use crate::observer::traits::ObserverRing;
use crate::storage::StorageError;
use crate::types::Record;

/// Error codes reported by the engine and the built-in observers
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const REQUIRED_FIELD_MISSING: &str = "REQUIRED_FIELD_MISSING";
    pub const INVALID_TYPE: &str = "INVALID_TYPE";
    pub const BELOW_MINIMUM: &str = "BELOW_MINIMUM";
    pub const ABOVE_MAXIMUM: &str = "ABOVE_MAXIMUM";
    pub const PATTERN_MISMATCH: &str = "PATTERN_MISMATCH";
    pub const INVALID_ENUM_VALUE: &str = "INVALID_ENUM_VALUE";
    pub const SCHEMA_VALIDATION: &str = "SCHEMA_VALIDATION";
    pub const OBSERVER_ERROR: &str = "OBSERVER_ERROR";
    pub const OBSERVER_TIMEOUT: &str = "OBSERVER_TIMEOUT";
    pub const MISSING_RECORD_ID: &str = "MISSING_RECORD_ID";
    pub const RECORD_NOT_FOUND: &str = "RECORD_NOT_FOUND";
    pub const RECORD_TRASHED: &str = "RECORD_TRASHED";
    pub const RECORD_NOT_TRASHED: &str = "RECORD_NOT_TRASHED";
    pub const SYSTEM_FIELD_READONLY: &str = "SYSTEM_FIELD_READONLY";
}

/// Errors an observer may return from `execute`
///
/// Whatever the variant, the runner records it as `OBSERVER_ERROR` tagged with
/// the observer's name. Observers that want a specific code push a
/// [`ValidationError`] onto the context instead of returning.
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("System error: {0}")]
    SystemError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Nested pipeline failed: {0}")]
    PipelineError(Box<PipelineError>),
}

impl From<PipelineError> for ObserverError {
    fn from(error: PipelineError) -> Self {
        ObserverError::PipelineError(Box::new(error))
    }
}

/// A single violation collected during a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ValidationError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            field: None,
            observer: None,
            record_index: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_observer(mut self, observer: impl Into<String>) -> Self {
        self.observer = Some(observer.into());
        self
    }

    pub fn at_record(mut self, index: usize) -> Self {
        self.record_index = Some(index);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Non-fatal issue; never blocks the database ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observer: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            field: None,
            observer: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_observer(mut self, observer: impl Into<String>) -> Self {
        self.observer = Some(observer.into());
        self
    }
}

/// Outcome of one runner execution, available to callers driving the runner directly
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub success: bool,
    /// Rows returned by the persistence capability (None when ring 5 never ran)
    pub result: Option<Vec<Record>>,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub metadata: Map<String, Value>,
    pub records: Vec<ModelRecord>,
    pub execution_time: Duration,
    pub rings_executed: Vec<ObserverRing>,
}

impl PipelineResult {
    /// True when the persistence capability was invoked
    pub fn persisted(&self) -> bool {
        self.result.is_some()
    }

    pub fn first_error(&self) -> Option<&ValidationError> {
        self.errors.first()
    }
}
