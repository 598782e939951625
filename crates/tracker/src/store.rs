//! The ticket store interface consumed by the reconciliation engine.

use async_trait::async_trait;

use crate::error::TrackerError;
use crate::models::{Comment, Contributor, NewTicket, Ticket, TicketQuery, TicketUpdate};

/// Trait for issue tracker backends (GitHub, in-memory, etc.).
///
/// An instance is bound to a single repository at construction time.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &'static str;

    /// List tickets matching the query.
    async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, TrackerError>;

    /// Create a ticket. May fail with [`TrackerError::Validation`] naming the
    /// offending field.
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket, TrackerError>;

    /// Update a ticket in place. Same failure shape as `create_ticket`.
    async fn update_ticket(&self, id: u64, update: &TicketUpdate) -> Result<Ticket, TrackerError>;

    /// Post a comment on a ticket.
    async fn comment_on_ticket(&self, id: u64, body: &str) -> Result<Comment, TrackerError>;

    /// Check whether a label is defined on the repository.
    async fn label_exists(&self, name: &str) -> Result<bool, TrackerError>;

    /// Define a label on the repository.
    async fn create_label(&self, name: &str) -> Result<(), TrackerError>;

    /// Contributors ranked by commit count, highest first.
    async fn list_contributors(&self) -> Result<Vec<Contributor>, TrackerError>;
}
