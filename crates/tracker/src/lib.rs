//! Issue tracker abstraction for compliance remediation.
//!
//! This crate provides the ticket store the reconciliation engine talks to:
//!
//! - [`TicketStore`] trait defines list/create/update/comment/label/contributor
//!   operations against a single repository
//! - [`GitHubTracker`] implements it over the GitHub REST API
//! - [`MemoryTracker`] implements it in process memory, for dry runs and tests
//!
//! # Example
//!
//! ```no_run
//! use tracker::{GitHubTracker, RepoRef, TicketQuery, TicketStore};
//!
//! # async fn example() -> Result<(), tracker::TrackerError> {
//! let tracker = GitHubTracker::new("token", RepoRef::new("todogroup", "repolinter"))?;
//! let query = TicketQuery::newest_with_labels(&["compliance".to_string()]);
//! for ticket in tracker.list_tickets(&query).await? {
//!     println!("#{} {}", ticket.id, ticket.title);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod github;
pub mod memory;
pub mod models;
pub mod store;

pub use error::TrackerError;
pub use github::{GitHubTracker, GITHUB_API_URL};
pub use memory::{CallCounts, MemoryTracker, Operation};
pub use models::{
    Comment, Contributor, NewTicket, RepoRef, SortDirection, SortField, StateFilter, Ticket,
    TicketQuery, TicketState, TicketUpdate,
};
pub use store::TicketStore;
