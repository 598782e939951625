//! Ticket, label and contributor types shared by every tracker backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository a tracker instance is bound to (`owner/name`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    #[must_use]
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    /// Parse an `owner/name` string. Returns `None` unless there are exactly
    /// two non-empty segments.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.trim().split('/').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(Self::new(parts[0], parts[1]))
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Ticket lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketState {
    #[default]
    Open,
    Closed,
}

impl TicketState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Snapshot of a ticket as fetched from the tracker.
///
/// Snapshots are never assumed to stay valid: the tracker is the only source
/// of truth and every write is issued against the ticket id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Tracker-assigned number
    pub id: u64,
    pub state: TicketState,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    /// Assignee logins, in tracker order
    pub assignees: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Ticket {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == TicketState::Open
    }

    #[must_use]
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }
}

/// State filter for ticket listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StateFilter {
    #[default]
    All,
    Open,
    Closed,
}

impl StateFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Sort field for ticket listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Created,
    Updated,
}

impl SortField {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

/// Sort direction for ticket listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Ticket listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketQuery {
    /// Tickets must carry every one of these labels
    pub labels: Vec<String>,
    pub state: StateFilter,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl TicketQuery {
    /// All tickets carrying `labels`, newest first.
    #[must_use]
    pub fn newest_with_labels(labels: &[String]) -> Self {
        Self {
            labels: labels.to_vec(),
            state: StateFilter::All,
            sort: SortField::Created,
            direction: SortDirection::Desc,
        }
    }
}

/// Payload for creating a ticket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewTicket {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

/// Payload for updating a ticket in place
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketUpdate {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    /// `None` leaves the current assignees untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    pub state: TicketState,
}

/// A comment posted on a ticket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub body: String,
}

/// Repository contributor with commit count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    pub contributions: u64,
}
