//! Error taxonomy for the measure lifecycle.
//!
//! Every failure the service can surface is one of these kinds, carrying its
//! field path and message natively. Heterogeneous origins (schema validation,
//! business rules, storage, the recognition call) all normalize into this one
//! shape, which keeps the API contract stable regardless of where a failure
//! started.

use crate::payload::PayloadError;
use thiserror::Error;

/// A single field-level validation issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldIssue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The seven failure kinds of the measure lifecycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasureError {
    /// Missing or malformed input field.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Unsupported or corrupt image payload.
    #[error("invalid image payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    /// A reading for this customer, type and billing month already exists.
    #[error("a reading for this month has already been submitted")]
    DuplicateReading,

    /// The recognition service produced no confident numeric reading.
    #[error("no numeric reading could be extracted from the image")]
    RecognitionFailed,

    /// No measure with the given id.
    #[error("measure not found: {0}")]
    NotFound(String),

    /// Confirmation is one-shot; this measure was already confirmed.
    #[error("measure {0} has already been confirmed")]
    AlreadyConfirmed(String),

    /// Backing-store fault that is not a business-rule violation.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl MeasureError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MeasureError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Normalize a list of validation issues: the first one wins. An empty
    /// list still yields a well-formed generic invalid-data error.
    pub fn from_issues(issues: Vec<FieldIssue>) -> Self {
        match issues.into_iter().next() {
            Some(issue) => MeasureError::Validation {
                field: issue.field,
                message: issue.message,
            },
            None => MeasureError::validation("", "invalid data"),
        }
    }

    /// Field path associated with the failure, where one exists.
    pub fn field_path(&self) -> Option<&str> {
        match self {
            MeasureError::Validation { field, .. } if !field.is_empty() => Some(field),
            MeasureError::InvalidPayload(_) => Some("image"),
            _ => None,
        }
    }
}
