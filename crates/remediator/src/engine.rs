//! Issue reconciliation engine.
//!
//! Given a broken rule and the issues already on the tracker, decides whether
//! to create a new issue, refresh or reopen the one that tracks the rule, or
//! leave everything alone because a maintainer applied the bypass label. The
//! tracker is the only source of truth; nothing is persisted locally.

use std::sync::Arc;
use tracing::{debug, info, warn};
use tracker::{
    NewTicket, RepoRef, Ticket, TicketQuery, TicketState, TicketStore, TicketUpdate, TrackerError,
};

use crate::assignee::{load_candidates, resolve_and_assign, DEFAULT_MAX_RETRIES};
use crate::error::FixError;
use crate::labels::ensure_labels;
use crate::marker::extract_identifier;
use crate::result::ReconciliationResult;
use crate::template::render_body;
use crate::violation::RuleViolation;

/// Per-run settings for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Repository the store is bound to; exposed to body templates
    pub repository: RepoRef,
    pub max_assignee_retries: usize,
}

impl ReconcileSettings {
    #[must_use]
    pub fn new(repository: RepoRef) -> Self {
        Self {
            repository,
            max_assignee_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Title, body and labels the current policy wants on the issue.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DesiredIssue {
    title: String,
    body: String,
    labels: Vec<String>,
}

/// Reconciles one rule violation at a time against a ticket store.
pub struct Reconciler {
    store: Arc<dyn TicketStore>,
    settings: ReconcileSettings,
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>, settings: ReconcileSettings) -> Self {
        Self { store, settings }
    }

    /// Ensure labels, list the rule's candidate issues, then reconcile.
    ///
    /// A rule id that cannot round-trip through the issue marker fails the
    /// result before any tracker call.
    pub async fn run(&self, violation: &RuleViolation, targets: &[String]) -> ReconciliationResult {
        if let Err(e) = violation.validate() {
            return FixError::from(e).into();
        }
        ensure_labels(self.store.as_ref(), &violation.labels_to_ensure()).await;

        let existing = match self.find_existing(violation).await {
            Ok(existing) => existing,
            Err(e) => return FixError::from(e).into(),
        };

        self.apply(violation, existing, targets)
            .await
            .unwrap_or_else(ReconciliationResult::from)
    }

    /// Reconcile `violation` against an already fetched issue listing.
    ///
    /// `existing` must be the listing for the violation's issue labels; `None`
    /// or an empty list means no issue exists yet.
    pub async fn reconcile(
        &self,
        violation: &RuleViolation,
        existing: Option<Vec<Ticket>>,
        targets: &[String],
    ) -> ReconciliationResult {
        if let Err(e) = violation.validate() {
            return FixError::from(e).into();
        }
        ensure_labels(self.store.as_ref(), &violation.labels_to_ensure()).await;

        self.apply(violation, existing, targets)
            .await
            .unwrap_or_else(ReconciliationResult::from)
    }

    /// All issues (open and closed) carrying the violation's labels, newest
    /// first. Returns `None` when there are none.
    pub async fn find_existing(
        &self,
        violation: &RuleViolation,
    ) -> Result<Option<Vec<Ticket>>, TrackerError> {
        let query = TicketQuery::newest_with_labels(&violation.issue_labels());
        let tickets = self.store.list_tickets(&query).await?;

        if tickets.is_empty() {
            return Ok(None);
        }

        let open: Vec<String> = tickets
            .iter()
            .filter(|t| t.is_open())
            .map(|t| format!("#{}", t.id))
            .collect();
        if open.len() > 1 {
            warn!(
                rule_id = %violation.unique_rule_id,
                "Found more than one matching open issue: {}.",
                open.join(", ")
            );
        }

        Ok(Some(tickets))
    }

    async fn apply(
        &self,
        violation: &RuleViolation,
        existing: Option<Vec<Ticket>>,
        targets: &[String],
    ) -> Result<ReconciliationResult, FixError> {
        let desired = self.desired(violation, targets)?;

        let mut tickets = match existing {
            Some(tickets) if !tickets.is_empty() => tickets,
            _ => {
                let created = self.create(violation, &desired).await?;
                return Ok(ReconciliationResult::success(
                    format!(
                        "No Open/Closed issues were found for this rule - Created new Github Issue with issue number - {}",
                        created.id
                    ),
                    targets.to_vec(),
                ));
            }
        };
        // Stable, so listings without timestamps keep the tracker's order.
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(ticket) = tickets
            .iter()
            .filter(|t| t.is_open())
            .find(|t| Self::tracks_rule(t, violation))
        {
            if violation.is_bypassed(ticket) {
                return Ok(Self::bypassed(ticket));
            }

            let stale = Self::stale_fields(ticket, &desired, violation);
            if stale.is_empty() {
                debug!(issue_number = ticket.id, "Issue is up to date");
                return Ok(ReconciliationResult::success(
                    format!(
                        "No Github Issue Created - Issue #{} already exists with correct unique identifier",
                        ticket.id
                    ),
                    Vec::new(),
                ));
            }

            info!(issue_number = ticket.id, stale = ?stale, "Refreshing stale issue");
            self.update(ticket, violation, &desired).await?;
            return Ok(ReconciliationResult::success(
                format!(
                    "No Github Issue Created - Issue #{} already exists with correct unique identifier, refreshed {}",
                    ticket.id,
                    stale.join(", ")
                ),
                targets.to_vec(),
            ));
        }

        if let Some(ticket) = tickets
            .iter()
            .filter(|t| !t.is_open())
            .find(|t| Self::tracks_rule(t, violation))
        {
            if violation.is_bypassed(ticket) {
                return Ok(Self::bypassed(ticket));
            }

            info!(issue_number = ticket.id, "Regression detected, reopening issue");
            self.update(ticket, violation, &desired).await?;
            self.store
                .comment_on_ticket(ticket.id, &violation.comment_body)
                .await?;
            return Ok(ReconciliationResult::success(
                format!(
                    "Github Issue {} re-opened as there seems to be regression!",
                    ticket.id
                ),
                targets.to_vec(),
            ));
        }

        let created = self.create(violation, &desired).await?;
        Ok(ReconciliationResult::success(
            format!("Github Issue {} Created!", created.id),
            targets.to_vec(),
        ))
    }

    fn desired(
        &self,
        violation: &RuleViolation,
        targets: &[String],
    ) -> Result<DesiredIssue, FixError> {
        Ok(DesiredIssue {
            title: violation.title.clone(),
            body: render_body(violation, &self.settings.repository, targets)?,
            labels: violation.issue_labels(),
        })
    }

    /// True when `ticket` carries the marker for this violation's rule.
    fn tracks_rule(ticket: &Ticket, violation: &RuleViolation) -> bool {
        match extract_identifier(&ticket.body) {
            Some(id) if id == violation.unique_rule_id => true,
            Some(id) => {
                debug!(
                    issue_number = ticket.id,
                    rule_id = %id,
                    "No matching rule identifier was found"
                );
                false
            }
            None => {
                warn!(
                    issue_number = ticket.id,
                    "No rule identifier found, was the issue modified manually?"
                );
                false
            }
        }
    }

    /// Fields where `ticket` differs from what the policy would produce.
    fn stale_fields(
        ticket: &Ticket,
        desired: &DesiredIssue,
        violation: &RuleViolation,
    ) -> Vec<&'static str> {
        let mut stale = Vec::new();
        if ticket.title != desired.title {
            stale.push("title");
        }
        if ticket.body != desired.body {
            stale.push("body");
        }
        if violation.assign_top_committer && ticket.assignees.is_empty() {
            stale.push("assignees");
        }
        stale
    }

    fn bypassed(ticket: &Ticket) -> ReconciliationResult {
        info!(issue_number = ticket.id, "Issue carries bypass label, skipping");
        ReconciliationResult::success(
            format!(
                "Rule fix failed as Github Issue {} has bypass label.",
                ticket.id
            ),
            Vec::new(),
        )
    }

    async fn create(
        &self,
        violation: &RuleViolation,
        desired: &DesiredIssue,
    ) -> Result<Ticket, TrackerError> {
        let base = NewTicket {
            title: desired.title.clone(),
            body: desired.body.clone(),
            labels: desired.labels.clone(),
            assignees: Vec::new(),
        };

        let created = if violation.assign_top_committer {
            let candidates = load_candidates(self.store.as_ref()).await;
            let store = self.store.as_ref();
            resolve_and_assign(
                |assignees| {
                    let ticket = NewTicket {
                        assignees,
                        ..base.clone()
                    };
                    async move { store.create_ticket(&ticket).await }
                },
                &candidates,
                self.settings.max_assignee_retries,
            )
            .await?
        } else {
            self.store.create_ticket(&base).await?
        };

        info!(
            issue_number = created.id,
            rule_id = %violation.unique_rule_id,
            "Created issue for broken rule"
        );
        Ok(created)
    }

    /// Rewrite `ticket` with the desired content and force it open.
    ///
    /// Labels already on the ticket are kept. Assignees are only touched when
    /// the policy wants one and the ticket has none.
    async fn update(
        &self,
        ticket: &Ticket,
        violation: &RuleViolation,
        desired: &DesiredIssue,
    ) -> Result<Ticket, TrackerError> {
        let mut labels = ticket.labels.clone();
        for label in &desired.labels {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }

        let base = TicketUpdate {
            title: desired.title.clone(),
            body: desired.body.clone(),
            labels,
            assignees: None,
            state: TicketState::Open,
        };

        if violation.assign_top_committer && ticket.assignees.is_empty() {
            let candidates = load_candidates(self.store.as_ref()).await;
            let store = self.store.as_ref();
            let id = ticket.id;
            resolve_and_assign(
                |assignees| {
                    let update = TicketUpdate {
                        assignees: Some(assignees),
                        ..base.clone()
                    };
                    async move { store.update_ticket(id, &update).await }
                },
                &candidates,
                self.settings.max_assignee_retries,
            )
            .await
        } else {
            self.store.update_ticket(ticket.id, &base).await
        }
    }
}
