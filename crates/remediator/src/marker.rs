//! Rule identifier marker embedded in issue bodies.
//!
//! Every issue this crate creates ends with a line of the form
//! `Unique rule set ID: <id>`. The marker is how a later run recognises
//! "this issue is about rule X", whatever happened to the title or labels.

use regex::Regex;
use std::sync::LazyLock;

/// Text preceding the rule identifier.
pub const MARKER_PREFIX: &str = "Unique rule set ID: ";

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Unique rule set ID: *([^\r\n]*)").unwrap());

/// Separator written between the body and the marker.
const MARKER_SEPARATOR: &str = "\n ";

/// Append the marker for `rule_id` to `body`.
///
/// The body is kept byte for byte. Any marker already present (and whatever
/// follows it) is dropped first together with its separator, so the result
/// always carries exactly one.
pub fn embed_identifier(body: &str, rule_id: &str) -> String {
    let base = match MARKER_RE.find(body) {
        Some(m) => {
            let head = &body[..m.start()];
            head.strip_suffix(MARKER_SEPARATOR).unwrap_or(head)
        }
        None => body,
    };
    format!("{base}{MARKER_SEPARATOR}{MARKER_PREFIX}{rule_id}")
}

/// Read the rule identifier back out of an issue body.
///
/// Returns `None` when the body has no marker or the marker is empty.
pub fn extract_identifier(body: &str) -> Option<&str> {
    MARKER_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|id| !id.is_empty())
}
