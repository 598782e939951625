//! Assignee resolution.
//!
//! Trackers refuse assignees that cannot be assigned (no push access, left the
//! organisation, ...). The resolver walks the ranked contributor list and
//! retries the same create/update with the next candidate whenever the tracker
//! rejects the `assignees` field, up to a fixed bound, then falls back to an
//! unassigned issue.

use std::future::Future;
use tracing::{debug, info, warn};
use tracker::{Contributor, TicketStore, TrackerError};

/// Default bound on retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Order contributors by commit count, highest first, and keep their logins.
///
/// Ties keep the tracker's order; duplicate logins are dropped.
pub fn rank_candidates(mut contributors: Vec<Contributor>) -> Vec<String> {
    contributors.sort_by(|a, b| b.contributions.cmp(&a.contributions));

    let mut ranked: Vec<String> = Vec::with_capacity(contributors.len());
    for contributor in contributors {
        if !contributor.login.is_empty() && !ranked.contains(&contributor.login) {
            ranked.push(contributor.login);
        }
    }
    ranked
}

/// Fetch ranked assignee candidates for the store's repository.
///
/// Lookup failures are logged and yield no candidates; the issue is then
/// written unassigned.
pub async fn load_candidates(store: &dyn TicketStore) -> Vec<String> {
    match store.list_contributors().await {
        Ok(contributors) => {
            let ranked = rank_candidates(contributors);
            debug!(candidates = ranked.len(), "Loaded assignee candidates");
            ranked
        }
        Err(e) => {
            warn!(error = %e, "Failed to list contributors, issue will be unassigned");
            Vec::new()
        }
    }
}

/// Run `attempt` with one candidate at a time until the tracker accepts it.
///
/// `attempt` receives the assignee list to send. Candidates are tried front
/// to back; only an assignee validation error moves on to the next one. At
/// most `max_retries + 1` candidates are tried. When they run out, one last
/// attempt is made with no assignee. Any other error is returned immediately.
pub async fn resolve_and_assign<T, F, Fut>(
    mut attempt: F,
    candidates: &[String],
    max_retries: usize,
) -> Result<T, TrackerError>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<T, TrackerError>>,
{
    let budget = candidates.len().min(max_retries.saturating_add(1));

    for (index, candidate) in candidates.iter().take(budget).enumerate() {
        match attempt(vec![candidate.clone()]).await {
            Ok(value) => {
                info!(assignee = %candidate, attempt = index + 1, "Assigned issue");
                return Ok(value);
            }
            Err(e) if e.is_assignee_validation() => {
                warn!(
                    assignee = %candidate,
                    attempt = index + 1,
                    budget,
                    error = %e,
                    "Tracker rejected assignee, trying next candidate"
                );
            }
            Err(e) => return Err(e),
        }
    }

    if !candidates.is_empty() {
        warn!(
            tried = budget,
            "No assignable candidate found, writing issue without assignee"
        );
    }
    attempt(Vec::new()).await
}
