//! Per-rule fix runner.

use std::sync::Arc;
use tracing::{error, info};
use tracker::{GitHubTracker, MemoryTracker, TicketStore};

use crate::config::RunConfig;
use crate::engine::Reconciler;
use crate::error::FixError;
use crate::result::ReconciliationResult;
use crate::violation::RuleViolation;

/// Build the ticket store for a run: GitHub, or the in-memory store in dry-run mode.
pub fn build_store(config: &RunConfig) -> Result<Arc<dyn TicketStore>, FixError> {
    if config.dry_run {
        info!(repo = %config.repository, "Dry run: tracker calls stay in memory");
        return Ok(Arc::new(MemoryTracker::new()));
    }

    let tracker = GitHubTracker::new(&config.token, config.repository.clone())?
        .with_base_url(&config.api_url);
    Ok(Arc::new(tracker))
}

/// Reconcile one violation against `store`.
pub async fn run_fix(
    store: Arc<dyn TicketStore>,
    config: &RunConfig,
    violation: &RuleViolation,
    targets: &[String],
) -> ReconciliationResult {
    info!(
        rule_id = %violation.unique_rule_id,
        repo = %config.repository,
        tracker = store.name(),
        "Reconciling rule violation"
    );

    let result = Reconciler::new(store, config.reconcile_settings())
        .run(violation, targets)
        .await;

    if result.succeeded {
        info!(rule_id = %violation.unique_rule_id, message = %result.message, "Fix applied");
    } else {
        error!(rule_id = %violation.unique_rule_id, message = %result.message, "Fix failed");
    }
    result
}

/// Resolve configuration from the environment and reconcile one violation.
///
/// Configuration problems come back as a failed result before any tracker
/// call is made.
pub async fn create_tracking_issue(
    violation: &RuleViolation,
    targets: &[String],
    dry_run: bool,
) -> ReconciliationResult {
    let config = match RunConfig::from_env(dry_run) {
        Ok(config) => config,
        Err(e) => return FixError::from(e).into(),
    };
    let store = match build_store(&config) {
        Ok(store) => store,
        Err(e) => return e.into(),
    };

    run_fix(store, &config, violation, targets).await
}
