//! Compliance remediation.
//!
//! When a policy rule is broken in a repository, this crate makes sure exactly
//! one tracking issue reflects it on the issue tracker, across any number of
//! runs:
//!
//! - `engine`: the create/refresh/reopen/bypass decision ([`Reconciler`])
//! - `assignee`: bounded retry over ranked assignee candidates
//! - `marker`: the `Unique rule set ID:` marker linking issues to rules
//! - `labels`: best-effort creation of required labels
//! - `template`: issue body rendering
//! - `config`: per-run configuration and fix file loading
//! - `runner`: per-rule entry points used by the `remediate` binary
//!
//! # Example
//!
//! ```no_run
//! use remediator::{create_tracking_issue, RuleViolation};
//!
//! # async fn example(violation: RuleViolation) {
//! let result = create_tracking_issue(&violation, &["LICENSE".to_string()], true).await;
//! println!("{}", result.message);
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assignee;
pub mod config;
pub mod engine;
pub mod error;
pub mod labels;
pub mod marker;
pub mod result;
pub mod runner;
pub mod template;
pub mod violation;

pub use assignee::{rank_candidates, resolve_and_assign, DEFAULT_MAX_RETRIES};
pub use config::{load_fix_file, ConfigError, RunConfig};
pub use engine::{ReconcileSettings, Reconciler};
pub use error::FixError;
pub use labels::{ensure_labels, LabelReport};
pub use marker::{embed_identifier, extract_identifier, MARKER_PREFIX};
pub use result::ReconciliationResult;
pub use runner::{build_store, create_tracking_issue, run_fix};
pub use violation::{FixEntry, RuleViolation};
