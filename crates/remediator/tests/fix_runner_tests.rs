//! Integration tests for the per-rule fix runner.
//!
//! These drive a full reconciliation through the public entry points: against
//! a mock GitHub API, through the dry-run store, and with broken configuration.

use remediator::{build_store, create_tracking_issue, run_fix, RuleViolation, RunConfig};
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Helpers
// =============================================================================

fn readme_violation() -> RuleViolation {
    serde_json::from_value(json!({
        "uniqueRuleId": "readme-exists",
        "issueTitle": "Add a README",
        "issueBody": "Repository {{repository}} has no README.",
        "issueBodyTemplate": true,
        "issueLabels": ["compliance"],
        "bypassLabel": "compliance-bypass",
        "commentBody": "The README is missing again."
    }))
    .unwrap()
}

fn github_config(server: &MockServer) -> RunConfig {
    let uri = server.uri();
    RunConfig::from_lookup(false, move |key| match key {
        "TARGET_REPO" => Some("acme/widgets".to_string()),
        "GITHUB_TOKEN" => Some("test-token".to_string()),
        "GITHUB_API_URL" => Some(uri.clone()),
        _ => None,
    })
    .unwrap()
}

async fn mount_labels(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/repos/acme/widgets/labels/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "label" })))
        .mount(server)
        .await;
}

// =============================================================================
// Tests
// =============================================================================

/// A closed issue carrying the rule marker is reopened and commented on.
#[tokio::test]
async fn test_regression_reopens_github_issue() {
    let server = MockServer::start().await;
    mount_labels(&server).await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .and(query_param("labels", "compliance"))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "number": 12,
            "state": "closed",
            "title": "Add a README",
            "body": "Old text\n Unique rule set ID: readme-exists",
            "labels": [{ "name": "compliance" }],
            "assignees": []
        }])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/repos/acme/widgets/issues/12"))
        .and(body_partial_json(json!({
            "state": "open",
            "body": "Repository acme/widgets has no README.\n Unique rule set ID: readme-exists"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 12,
            "state": "open",
            "title": "Add a README",
            "body": "Repository acme/widgets has no README.\n Unique rule set ID: readme-exists",
            "labels": [{ "name": "compliance" }],
            "assignees": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/widgets/issues/12/comments"))
        .and(body_partial_json(json!({ "body": "The README is missing again." })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 1,
            "body": "The README is missing again."
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/widgets/issues"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let config = github_config(&server);
    let store = build_store(&config).unwrap();
    let result = run_fix(store, &config, &readme_violation(), &["README.md".to_string()]).await;

    assert!(result.succeeded, "{}", result.message);
    assert_eq!(
        result.message,
        "Github Issue 12 re-opened as there seems to be regression!"
    );
}

/// Missing labels are created before the issue is opened.
#[tokio::test]
async fn test_creates_labels_and_issue_on_github() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/repos/acme/widgets/labels/.+$"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/widgets/labels"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "name": "label" })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/widgets/issues"))
        .and(body_partial_json(json!({
            "title": "Add a README",
            "labels": ["compliance"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 31,
            "state": "open",
            "title": "Add a README",
            "body": "Repository acme/widgets has no README.\n Unique rule set ID: readme-exists",
            "labels": [{ "name": "compliance" }],
            "assignees": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = github_config(&server);
    let store = build_store(&config).unwrap();
    let result = run_fix(store, &config, &readme_violation(), &["README.md".to_string()]).await;

    assert!(result.succeeded, "{}", result.message);
    assert!(result.message.ends_with("issue number - 31"));
    assert_eq!(result.targets, vec!["README.md".to_string()]);
}

/// Bodies without the template flag are posted exactly as written.
#[tokio::test]
async fn test_literal_body_is_posted_verbatim() {
    let server = MockServer::start().await;
    mount_labels(&server).await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let body = "Add `${{ secrets.NPM_TOKEN }}` to .github/workflows/release.yml\n Unique rule set ID: npm-token-set";
    Mock::given(method("POST"))
        .and(path("/repos/acme/widgets/issues"))
        .and(body_partial_json(json!({ "body": body })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 40,
            "state": "open",
            "title": "Set the npm token",
            "body": body,
            "labels": [],
            "assignees": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let violation: RuleViolation = serde_json::from_value(json!({
        "uniqueRuleId": "npm-token-set",
        "issueTitle": "Set the npm token",
        "issueBody": "Add `${{ secrets.NPM_TOKEN }}` to .github/workflows/release.yml",
        "bypassLabel": "compliance-bypass"
    }))
    .unwrap();

    let config = github_config(&server);
    let store = build_store(&config).unwrap();
    let result = run_fix(store, &config, &violation, &[]).await;

    assert!(result.succeeded, "{}", result.message);
    assert!(result.message.ends_with("issue number - 40"));
}

/// A tracker outage fails the fix instead of crashing the run.
#[tokio::test]
async fn test_tracker_outage_is_a_failed_result() {
    let server = MockServer::start().await;
    mount_labels(&server).await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "Service Unavailable" })),
        )
        .mount(&server)
        .await;

    let config = github_config(&server);
    let store = build_store(&config).unwrap();
    let result = run_fix(store, &config, &readme_violation(), &[]).await;

    assert!(!result.succeeded);
    assert!(result.message.contains("503"), "{}", result.message);
}

/// Dry run substitutes the placeholder repository and never needs credentials.
#[tokio::test]
#[serial]
async fn test_dry_run_uses_in_memory_tracker() {
    std::env::remove_var("TARGET_REPO");
    std::env::remove_var("GITHUB_TOKEN");
    std::env::remove_var("ASSIGNEE_MAX_RETRIES");

    let result = create_tracking_issue(&readme_violation(), &["README.md".to_string()], true).await;

    assert!(result.succeeded, "{}", result.message);
    assert!(result.message.ends_with("issue number - 1"));
}

/// Missing credentials surface as a failed result before any tracker call.
#[tokio::test]
#[serial]
async fn test_missing_environment_fails_fix() {
    std::env::remove_var("TARGET_REPO");
    std::env::remove_var("GITHUB_TOKEN");

    let result = create_tracking_issue(&readme_violation(), &[], false).await;

    assert!(!result.succeeded);
    assert!(result.message.contains("TARGET_REPO and GITHUB_TOKEN"));
    assert!(result.targets.is_empty());
}
