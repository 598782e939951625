//! Issue body rendering.

use handlebars::Handlebars;
use serde::Serialize;
use tracker::RepoRef;

use crate::error::FixError;
use crate::marker::embed_identifier;
use crate::violation::RuleViolation;

/// Values available to `{{...}}` placeholders in an issue body.
#[derive(Debug, Serialize)]
struct BodyContext<'a> {
    rule_id: &'a str,
    repository: String,
    targets: &'a [String],
}

/// Build the issue body for `violation` and append the rule marker.
///
/// The body is posted as written unless the violation opts into templating,
/// so text such as `${{ secrets.TOKEN }}` survives untouched. Templates are
/// rendered in strict mode: an unknown placeholder is an error rather than
/// an empty string.
///
/// Output is deterministic for a given violation, repository and target
/// list, so comparing it with an existing issue body detects stale content.
pub fn render_body(
    violation: &RuleViolation,
    repository: &RepoRef,
    targets: &[String],
) -> Result<String, FixError> {
    if !violation.body_is_template {
        return Ok(embed_identifier(&violation.body, &violation.unique_rule_id));
    }

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    let context = BodyContext {
        rule_id: &violation.unique_rule_id,
        repository: repository.to_string(),
        targets,
    };
    let body = handlebars.render_template(&violation.body, &context)?;

    Ok(embed_identifier(&body, &violation.unique_rule_id))
}
