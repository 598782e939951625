//! In-memory tracker.
//!
//! Serves as the no-network transport for dry runs and as the double the
//! reconciliation tests assert against. Every call is counted per operation,
//! assignee lists of every create/update attempt are recorded, and failures
//! can be injected per operation or per assignee login.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::error::TrackerError;
use crate::models::{
    Comment, Contributor, NewTicket, StateFilter, Ticket, TicketQuery, TicketState, TicketUpdate,
};
use crate::store::TicketStore;

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Update,
    Comment,
    LabelExists,
    CreateLabel,
    Contributors,
}

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub create: usize,
    pub update: usize,
    pub comment: usize,
    pub label_exists: usize,
    pub create_label: usize,
    pub contributors: usize,
}

impl CallCounts {
    /// Calls that modify tickets.
    #[must_use]
    pub fn ticket_writes(&self) -> usize {
        self.create + self.update + self.comment
    }
}

#[derive(Debug, Default)]
struct State {
    tickets: Vec<Ticket>,
    comments: Vec<(u64, Comment)>,
    labels: BTreeSet<String>,
    contributors: Vec<Contributor>,
    next_id: u64,
    next_comment_id: u64,
    calls: CallCounts,
    create_attempts: Vec<Vec<String>>,
    update_attempts: Vec<Option<Vec<String>>>,
    rejected_assignees: HashSet<String>,
    failing: HashSet<Operation>,
}

/// Ticket store held entirely in process memory.
#[derive(Debug)]
pub struct MemoryTracker {
    state: Mutex<State>,
}

impl Default for MemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                next_comment_id: 1,
                ..State::default()
            }),
        }
    }

    /// Seed existing tickets. New tickets are numbered after the highest seeded id.
    #[must_use]
    pub fn with_tickets(self, tickets: Vec<Ticket>) -> Self {
        {
            let mut state = self.lock();
            let max_id = tickets.iter().map(|t| t.id).max().unwrap_or(0);
            state.next_id = state.next_id.max(max_id + 1);
            state.tickets = tickets;
        }
        self
    }

    /// Seed repository labels.
    #[must_use]
    pub fn with_labels(self, labels: &[&str]) -> Self {
        self.lock()
            .labels
            .extend(labels.iter().map(|l| (*l).to_string()));
        self
    }

    /// Seed contributors, in the order `list_contributors` should return them.
    #[must_use]
    pub fn with_contributors(self, contributors: Vec<Contributor>) -> Self {
        self.lock().contributors = contributors;
        self
    }

    /// Reject any create/update whose assignees include one of `logins`.
    #[must_use]
    pub fn reject_assignees(self, logins: &[&str]) -> Self {
        self.lock()
            .rejected_assignees
            .extend(logins.iter().map(|l| (*l).to_string()));
        self
    }

    /// Make every call of `operation` fail with a server error.
    #[must_use]
    pub fn fail_on(self, operation: Operation) -> Self {
        self.lock().failing.insert(operation);
        self
    }

    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// Current tickets, in insertion order.
    #[must_use]
    pub fn tickets(&self) -> Vec<Ticket> {
        self.lock().tickets.clone()
    }

    #[must_use]
    pub fn ticket(&self, id: u64) -> Option<Ticket> {
        self.lock().tickets.iter().find(|t| t.id == id).cloned()
    }

    /// Comments posted, as `(ticket id, comment)`.
    #[must_use]
    pub fn comments(&self) -> Vec<(u64, Comment)> {
        self.lock().comments.clone()
    }

    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.lock().labels.iter().cloned().collect()
    }

    /// Assignee list sent with each create attempt, in call order.
    #[must_use]
    pub fn create_attempts(&self) -> Vec<Vec<String>> {
        self.lock().create_attempts.clone()
    }

    /// Assignee list sent with each update attempt, in call order.
    #[must_use]
    pub fn update_attempts(&self) -> Vec<Option<Vec<String>>> {
        self.lock().update_attempts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl State {
    fn check(&self, operation: Operation) -> Result<(), TrackerError> {
        if self.failing.contains(&operation) {
            return Err(TrackerError::Api {
                status: 500,
                message: format!("injected {operation:?} failure"),
            });
        }
        Ok(())
    }

    fn check_assignees(&self, assignees: &[String]) -> Result<(), TrackerError> {
        if let Some(bad) = assignees
            .iter()
            .find(|a| self.rejected_assignees.contains(*a))
        {
            return Err(TrackerError::Validation {
                field: "assignees".to_string(),
                message: format!("'{bad}' cannot be assigned"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TicketStore for MemoryTracker {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, TrackerError> {
        let mut state = self.lock();
        state.calls.list += 1;
        state.check(Operation::List)?;

        let mut tickets: Vec<Ticket> = state
            .tickets
            .iter()
            .filter(|t| query.labels.iter().all(|l| t.has_label(l)))
            .filter(|t| match query.state {
                StateFilter::All => true,
                StateFilter::Open => t.is_open(),
                StateFilter::Closed => !t.is_open(),
            })
            .cloned()
            .collect();

        // Ids are handed out in creation order.
        tickets.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(tickets)
    }

    async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket, TrackerError> {
        let mut state = self.lock();
        state.calls.create += 1;
        state.create_attempts.push(ticket.assignees.clone());
        state.check(Operation::Create)?;
        state.check_assignees(&ticket.assignees)?;

        let created = Ticket {
            id: state.next_id,
            state: TicketState::Open,
            title: ticket.title.clone(),
            body: ticket.body.clone(),
            labels: ticket.labels.clone(),
            assignees: ticket.assignees.clone(),
            created_at: Some(Utc::now()),
        };
        state.next_id += 1;
        state.tickets.push(created.clone());

        debug!(ticket_id = created.id, "Created in-memory ticket");
        Ok(created)
    }

    async fn update_ticket(&self, id: u64, update: &TicketUpdate) -> Result<Ticket, TrackerError> {
        let mut state = self.lock();
        state.calls.update += 1;
        state.update_attempts.push(update.assignees.clone());
        state.check(Operation::Update)?;
        if let Some(assignees) = &update.assignees {
            state.check_assignees(assignees)?;
        }

        let ticket = state
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TrackerError::NotFound(format!("ticket {id}")))?;

        ticket.title.clone_from(&update.title);
        ticket.body.clone_from(&update.body);
        ticket.labels.clone_from(&update.labels);
        ticket.state = update.state;
        if let Some(assignees) = &update.assignees {
            ticket.assignees.clone_from(assignees);
        }

        debug!(ticket_id = id, "Updated in-memory ticket");
        Ok(ticket.clone())
    }

    async fn comment_on_ticket(&self, id: u64, body: &str) -> Result<Comment, TrackerError> {
        let mut state = self.lock();
        state.calls.comment += 1;
        state.check(Operation::Comment)?;

        if !state.tickets.iter().any(|t| t.id == id) {
            return Err(TrackerError::NotFound(format!("ticket {id}")));
        }

        let comment = Comment {
            id: state.next_comment_id,
            body: body.to_string(),
        };
        state.next_comment_id += 1;
        state.comments.push((id, comment.clone()));
        Ok(comment)
    }

    async fn label_exists(&self, name: &str) -> Result<bool, TrackerError> {
        let mut state = self.lock();
        state.calls.label_exists += 1;
        state.check(Operation::LabelExists)?;
        Ok(state.labels.contains(name))
    }

    async fn create_label(&self, name: &str) -> Result<(), TrackerError> {
        let mut state = self.lock();
        state.calls.create_label += 1;
        state.check(Operation::CreateLabel)?;
        state.labels.insert(name.to_string());
        Ok(())
    }

    async fn list_contributors(&self) -> Result<Vec<Contributor>, TrackerError> {
        let mut state = self.lock();
        state.calls.contributors += 1;
        state.check(Operation::Contributors)?;
        Ok(state.contributors.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(id: u64, state: TicketState, labels: &[&str]) -> Ticket {
        Ticket {
            id,
            state,
            title: format!("ticket {id}"),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
            ..Ticket::default()
        }
    }

    #[tokio::test]
    async fn test_list_filters_by_every_label_newest_first() {
        let tracker = MemoryTracker::new().with_tickets(vec![
            ticket(1, TicketState::Closed, &["a", "b"]),
            ticket(2, TicketState::Open, &["a"]),
            ticket(3, TicketState::Open, &["a", "b", "c"]),
        ]);

        let query = TicketQuery::newest_with_labels(&["a".to_string(), "b".to_string()]);
        let ids: Vec<u64> = tracker
            .list_tickets(&query)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(tracker.calls().list, 1);
    }

    #[tokio::test]
    async fn test_create_numbers_after_seeded_tickets() {
        let tracker = MemoryTracker::new().with_tickets(vec![ticket(41, TicketState::Open, &[])]);
        let created = tracker.create_ticket(&NewTicket::default()).await.unwrap();
        assert_eq!(created.id, 42);
        assert!(created.is_open());
    }

    #[tokio::test]
    async fn test_rejected_assignee_is_a_validation_error() {
        let tracker = MemoryTracker::new().reject_assignees(&["ghost"]);
        let err = tracker
            .create_ticket(&NewTicket {
                assignees: vec!["ghost".to_string()],
                ..NewTicket::default()
            })
            .await
            .unwrap_err();

        assert!(err.is_assignee_validation());
        assert_eq!(tracker.create_attempts(), vec![vec!["ghost".to_string()]]);
        assert!(tracker.tickets().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let tracker = MemoryTracker::new().fail_on(Operation::CreateLabel);
        assert!(tracker.create_label("x").await.is_err());
        assert!(!tracker.label_exists("x").await.unwrap());
        assert_eq!(tracker.calls().create_label, 1);
    }

    #[tokio::test]
    async fn test_update_keeps_assignees_when_untouched() {
        let mut seeded = ticket(5, TicketState::Closed, &["a"]);
        seeded.assignees = vec!["octocat".to_string()];
        let tracker = MemoryTracker::new().with_tickets(vec![seeded]);

        let updated = tracker
            .update_ticket(
                5,
                &TicketUpdate {
                    title: "new".to_string(),
                    body: "body".to_string(),
                    labels: vec!["a".to_string()],
                    assignees: None,
                    state: TicketState::Open,
                },
            )
            .await
            .unwrap();

        assert!(updated.is_open());
        assert_eq!(updated.assignees, vec!["octocat".to_string()]);
        assert_eq!(tracker.calls().ticket_writes(), 1);
    }
}
