//! Outcome of one reconciliation.

use serde::Serialize;

use crate::error::FixError;

/// Result reported back to the per-rule runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// Human-readable description of what happened
    pub message: String,
    /// Files or references the fix concerned
    pub targets: Vec<String>,
    pub succeeded: bool,
}

impl ReconciliationResult {
    pub fn success(message: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            message: message.into(),
            targets,
            succeeded: true,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            targets: Vec::new(),
            succeeded: false,
        }
    }
}

impl From<FixError> for ReconciliationResult {
    fn from(err: FixError) -> Self {
        Self::failure(err.to_string())
    }
}
