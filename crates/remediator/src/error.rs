//! Error taxonomy for fix runs.

use thiserror::Error;
use tracker::TrackerError;

use crate::config::ConfigError;

/// Errors that can fail a single fix.
///
/// Label creation problems never show up here: they are logged by the label
/// ensurer and absorbed. Assignee validation failures only reach this type
/// when they are not retryable any more.
#[derive(Debug, Error)]
pub enum FixError {
    /// Required configuration missing or invalid; raised before any tracker call
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// A tracker create/update/comment/list call failed
    #[error("{0}")]
    Tracker(#[from] TrackerError),

    /// The issue body template could not be rendered
    #[error("Failed to render issue body: {0}")]
    Template(#[from] handlebars::RenderError),
}
