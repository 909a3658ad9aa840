//! Client-facing rendering of validation issues.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{PathSegment, ValidationIssue};

/// Token that replaces context values with no data representation.
pub const REDACTED: &str = "[filtered]";

/// Normalized, redacted description of one schema failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidParameter {
    /// Field path rendered as `segment[sub][sub2]`.
    pub name: String,
    /// The issue message.
    pub reason: String,
    /// Remaining issue context, filtered.
    pub context: Map<String, Value>,
}

/// Converts issues into invalid parameters, one per issue, in order.
///
/// ```
/// use covenant_core::{extract_invalid_parameters, ValidationIssue};
///
/// let issue = ValidationIssue::new(vec!["a".into(), 0.into(), "b".into()], "Required");
/// let params = extract_invalid_parameters(&[issue]);
/// assert_eq!(params[0].name, "a[0][b]");
/// ```
#[must_use]
pub fn extract_invalid_parameters(issues: &[ValidationIssue]) -> Vec<InvalidParameter> {
    issues
        .iter()
        .map(|issue| InvalidParameter {
            name: render_path(&issue.path),
            reason: issue.message.clone(),
            context: issue
                .context
                .iter()
                .map(|(key, value)| (key.clone(), value.to_filtered_value()))
                .collect(),
        })
        .collect()
}

/// Renders a path: first segment bare, later segments bracketed.
#[must_use]
pub fn render_path(path: &[PathSegment]) -> String {
    let mut segments = path.iter();
    let mut name = match segments.next() {
        Some(first) => first.to_string(),
        None => return String::new(),
    };
    for segment in segments {
        name.push('[');
        name.push_str(&segment.to_string());
        name.push(']');
    }
    name
}
