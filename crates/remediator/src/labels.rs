//! Best-effort creation of the labels a fix relies on.

use tracing::{debug, info, warn};
use tracker::TicketStore;

/// What happened while ensuring labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelReport {
    /// Labels that were missing and got created
    pub created: Vec<String>,
    /// Labels whose check or creation failed
    pub failed: Vec<String>,
}

/// Make sure every label in `labels` exists on the repository.
///
/// Each label is handled on its own: a failure is logged and recorded in the
/// report, and never stops the remaining labels or the caller.
pub async fn ensure_labels(store: &dyn TicketStore, labels: &[String]) -> LabelReport {
    let mut report = LabelReport::default();

    for label in labels {
        match store.label_exists(label).await {
            Ok(true) => {
                debug!(label = %label, "Label already exists");
            }
            Ok(false) => match store.create_label(label).await {
                Ok(()) => {
                    info!(label = %label, "Created missing label");
                    report.created.push(label.clone());
                }
                Err(e) => {
                    warn!(label = %label, error = %e, "Failed to create label");
                    report.failed.push(label.clone());
                }
            },
            Err(e) => {
                warn!(label = %label, error = %e, "Failed to check label");
                report.failed.push(label.clone());
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker::{MemoryTracker, Operation};

    fn names(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| (*l).to_string()).collect()
    }

    #[tokio::test]
    async fn test_creates_only_missing_labels() {
        let store = MemoryTracker::new().with_labels(&["compliance"]);
        let report = ensure_labels(&store, &names(&["compliance", "bypass"])).await;

        assert_eq!(report.created, names(&["bypass"]));
        assert!(report.failed.is_empty());
        assert_eq!(store.labels(), names(&["bypass", "compliance"]));
        assert_eq!(store.calls().create_label, 1);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_other_labels() {
        let store = MemoryTracker::new().fail_on(Operation::CreateLabel);
        let report = ensure_labels(&store, &names(&["a", "b"])).await;

        assert_eq!(report.failed, names(&["a", "b"]));
        assert_eq!(store.calls().label_exists, 2);
        assert_eq!(store.calls().create_label, 2);
    }

    #[tokio::test]
    async fn test_check_failure_skips_creation() {
        let store = MemoryTracker::new().fail_on(Operation::LabelExists);
        let report = ensure_labels(&store, &names(&["a"])).await;

        assert_eq!(report.failed, names(&["a"]));
        assert_eq!(store.calls().create_label, 0);
    }
}
