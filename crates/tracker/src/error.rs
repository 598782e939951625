//! Error types for tracker operations.

use thiserror::Error;

/// Errors that can occur when talking to an issue tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The tracker answered with a non-success status
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The tracker rejected a specific request field
    #[error("Validation failed for field '{field}': {message}")]
    Validation { field: String, message: String },

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl TrackerError {
    /// True when the tracker refused the request because of the assignee list.
    ///
    /// This is the only failure the assignee resolver retries; everything else
    /// surfaces to the caller unchanged.
    #[must_use]
    pub fn is_assignee_validation(&self) -> bool {
        matches!(self, Self::Validation { field, .. } if field == "assignees" || field == "assignee")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignee_validation_classification() {
        let err = TrackerError::Validation {
            field: "assignees".to_string(),
            message: "invalid".to_string(),
        };
        assert!(err.is_assignee_validation());

        let err = TrackerError::Validation {
            field: "labels".to_string(),
            message: "invalid".to_string(),
        };
        assert!(!err.is_assignee_validation());

        let err = TrackerError::Api {
            status: 422,
            message: "Validation Failed".to_string(),
        };
        assert!(!err.is_assignee_validation());
    }

    #[test]
    fn test_error_messages() {
        let err = TrackerError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "GitHub API error: 500 - boom");

        let err = TrackerError::Validation {
            field: "assignees".to_string(),
            message: "Validation Failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Validation failed for field 'assignees': Validation Failed"
        );
    }
}
