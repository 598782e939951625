//! Rule violation descriptor handed to the reconciler.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracker::Ticket;

use crate::config::ConfigError;

/// A broken policy rule that needs a tracking issue.
///
/// Field names on the wire follow the rule-option names used in fix files
/// (`uniqueRuleId`, `issueTitle`, `issueBody`, ...). A value is treated as
/// immutable for the duration of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleViolation {
    /// Stable identifier embedded in the issue body
    pub unique_rule_id: String,
    #[serde(rename = "issueTitle")]
    pub title: String,
    /// Issue body, posted as written unless `body_is_template` is set
    #[serde(rename = "issueBody")]
    pub body: String,
    /// Render `body` as a handlebars template before posting
    #[serde(rename = "issueBodyTemplate", default)]
    pub body_is_template: bool,
    #[serde(rename = "issueLabels", default)]
    pub labels: BTreeSet<String>,
    /// Label maintainers apply to stop automation on an issue
    pub bypass_label: String,
    /// Posted when a closed issue is reopened
    #[serde(default)]
    pub comment_body: String,
    #[serde(default)]
    pub assign_top_committer: bool,
}

impl RuleViolation {
    /// Labels put on created issues and used to filter the issue listing.
    /// Never contains the bypass label.
    pub fn issue_labels(&self) -> Vec<String> {
        self.labels
            .iter()
            .filter(|l| **l != self.bypass_label)
            .cloned()
            .collect()
    }

    /// Labels that must exist on the repository: the issue labels plus the
    /// bypass label.
    pub fn labels_to_ensure(&self) -> Vec<String> {
        let mut all = self.labels.clone();
        if !self.bypass_label.is_empty() {
            all.insert(self.bypass_label.clone());
        }
        all.into_iter().collect()
    }

    /// Check that the rule id reads back unchanged from an issue body marker.
    ///
    /// The marker is a single line and is trimmed when read, so an empty,
    /// padded or multi-line id would never match its own issue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = &self.unique_rule_id;
        let reason = if id.is_empty() {
            "must not be empty"
        } else if id.trim() != id {
            "must not start or end with whitespace"
        } else if id.contains(['\r', '\n']) {
            "must fit on one line"
        } else {
            return Ok(());
        };
        Err(ConfigError::InvalidRuleId {
            id: id.clone(),
            reason,
        })
    }

    /// True when a maintainer has put the bypass label on `ticket`.
    pub fn is_bypassed(&self, ticket: &Ticket) -> bool {
        !self.bypass_label.is_empty() && ticket.has_label(&self.bypass_label)
    }
}

/// One entry of a fix file: the violation plus the files it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixEntry {
    #[serde(flatten)]
    pub violation: RuleViolation,
    #[serde(default)]
    pub targets: Vec<String>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_violation() -> RuleViolation {
        RuleViolation {
            unique_rule_id: "license-file-exists".to_string(),
            title: "Missing LICENSE file".to_string(),
            body: "This repository is missing a LICENSE file.".to_string(),
            body_is_template: false,
            labels: ["compliance", "repolinter"]
                .iter()
                .map(|l| (*l).to_string())
                .collect(),
            bypass_label: "repolinter-bypass".to_string(),
            comment_body: "The LICENSE file is missing again.".to_string(),
            assign_top_committer: false,
        }
    }

    #[test]
    fn test_label_views_do_not_mutate_requested_set() {
        let mut violation = sample_violation();
        violation.labels.insert("repolinter-bypass".to_string());

        assert_eq!(
            violation.issue_labels(),
            vec!["compliance".to_string(), "repolinter".to_string()]
        );
        assert_eq!(
            violation.labels_to_ensure(),
            vec![
                "compliance".to_string(),
                "repolinter".to_string(),
                "repolinter-bypass".to_string()
            ]
        );
        assert_eq!(violation.labels.len(), 3);
    }

    #[test]
    fn test_is_bypassed() {
        let violation = sample_violation();
        let mut ticket = Ticket {
            labels: vec!["compliance".to_string()],
            ..Ticket::default()
        };
        assert!(!violation.is_bypassed(&ticket));

        ticket.labels.push("repolinter-bypass".to_string());
        assert!(violation.is_bypassed(&ticket));
    }

    #[test]
    fn test_deserialize_rule_options() {
        let json = r#"{
            "uniqueRuleId": "readme",
            "issueTitle": "Add a README",
            "issueBody": "Please add a README",
            "issueLabels": ["compliance"],
            "bypassLabel": "bypass",
            "commentBody": "README missing again",
            "targets": ["README.md"]
        }"#;

        let entry: FixEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.violation.unique_rule_id, "readme");
        assert_eq!(entry.violation.title, "Add a README");
        assert!(!entry.violation.assign_top_committer);
        assert!(!entry.violation.body_is_template);
        assert_eq!(entry.targets, vec!["README.md".to_string()]);
    }

    #[test]
    fn test_validate_rule_id() {
        let mut violation = sample_violation();
        assert!(violation.validate().is_ok());

        for id in ["", "padded ", "\tpadded", "two\nlines", "cr\rid"] {
            violation.unique_rule_id = id.to_string();
            assert!(
                matches!(violation.validate(), Err(ConfigError::InvalidRuleId { .. })),
                "{id:?} should be rejected"
            );
        }
    }
}
