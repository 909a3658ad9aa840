//! Schema capability and validation issue model.
//!
//! A [`Schema`] validates a decoded [`Value`] and produces typed data. The
//! pipeline never depends on a concrete validation engine: [`ShapeSchema`]
//! and [`TypedSchema`] are the bundled variants, and any other engine can be
//! plugged in by implementing the trait.
//!
//! Failures are reported as a [`SchemaError`], an ordered list of
//! [`ValidationIssue`]s. Each issue carries the path of the offending value,
//! a message, and kind-specific context.
//!
//! [`ShapeSchema`]: crate::shape::ShapeSchema
//! [`TypedSchema`]: crate::typed::TypedSchema

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::invalid_parameter::{extract_invalid_parameters, InvalidParameter, REDACTED};

/// A validator/parser for one value shape.
///
/// `safe_parse` reports failures as data so callers can convert them into a
/// client error. `parse` is the strict form: its failure is an opaque error
/// meant to be propagated with `?` (used where a failure indicates a
/// programming error rather than bad client input).
pub trait Schema: Send + Sync {
    /// The validated output type.
    type Output;

    /// Validates `input`, returning the parsed output or the issues found.
    fn safe_parse(&self, input: &Value) -> Result<Self::Output, SchemaError>;

    /// Validates `input`, returning the parsed output or a propagating error.
    fn parse(&self, input: &Value) -> anyhow::Result<Self::Output> {
        self.safe_parse(input).map_err(anyhow::Error::from)
    }
}

impl<S: Schema + ?Sized> Schema for Box<S> {
    type Output = S::Output;

    fn safe_parse(&self, input: &Value) -> Result<Self::Output, SchemaError> {
        (**self).safe_parse(input)
    }
}

impl<S: Schema + ?Sized> Schema for Arc<S> {
    type Output = S::Output;

    fn safe_parse(&self, input: &Value) -> Result<Self::Output, SchemaError> {
        (**self).safe_parse(input)
    }
}

/// One segment of an issue path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object member name.
    Key(String),
    /// Array index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Key(key) => serializer.serialize_str(key),
            Self::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

/// Kind-specific context attached to a [`ValidationIssue`].
///
/// Context may reference arbitrary values (limits, received values, custom
/// validators). Anything that is not plain data is kept as [`Opaque`] and is
/// redacted whenever the issue is rendered for a client.
///
/// [`Opaque`]: ContextValue::Opaque
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    /// `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A finite number.
    Number(Number),
    /// A string.
    String(String),
    /// A point in time, rendered as an RFC 3339 timestamp.
    Timestamp(DateTime<Utc>),
    /// An ordered list.
    List(Vec<ContextValue>),
    /// A string-keyed map.
    Map(IndexMap<String, ContextValue>),
    /// A value with no data representation, identified by its type name.
    Opaque(&'static str),
}

impl ContextValue {
    /// Creates an opaque value named after `T`.
    #[must_use]
    pub fn opaque<T: ?Sized>() -> Self {
        Self::Opaque(std::any::type_name::<T>())
    }

    /// Renders this value as client-safe data, redacting opaque values.
    #[must_use]
    pub fn to_filtered_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Timestamp(ts) => Value::String(render_timestamp(ts)),
            Self::List(items) => Value::Array(items.iter().map(Self::to_filtered_value).collect()),
            Self::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_filtered_value()))
                    .collect(),
            ),
            Self::Opaque(_) => Value::String(REDACTED.to_string()),
        }
    }
}

/// Renders a timestamp as RFC 3339 in UTC with a `Z` suffix.
///
/// Fractional seconds appear only when non-zero, matching the `Serialize`
/// output that [`value_to_data`](crate::value_to_data) produces for the same
/// instant: `2024-05-01T08:00:00Z`, `2024-05-01T08:00:00.250Z`.
#[must_use]
pub fn render_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl Serialize for ContextValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Timestamp(ts) => serializer.serialize_str(&render_timestamp(ts)),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Opaque(_) => serializer.serialize_str(REDACTED),
        }
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for ContextValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<usize> for ContextValue {
    fn from(value: usize) -> Self {
        Self::Number((value as u64).into())
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<DateTime<Utc>> for ContextValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Vec<ContextValue>> for ContextValue {
    fn from(value: Vec<ContextValue>) -> Self {
        Self::List(value)
    }
}

impl From<&Value> for ContextValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

/// A single schema validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// Location of the offending value.
    pub path: Vec<PathSegment>,
    /// Human-readable message.
    pub message: String,
    /// Kind-specific context (e.g. `code`, `expected`, `received`).
    pub context: IndexMap<String, ContextValue>,
}

impl ValidationIssue {
    /// Creates an issue with no context.
    #[must_use]
    pub fn new(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            context: IndexMap::new(),
        }
    }

    /// Adds a context entry.
    ///
    /// `path` and `message` are not context and are ignored here.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        let key = key.into();
        if key != "path" && key != "message" {
            self.context.insert(key, value.into());
        }
        self
    }

    /// Returns the `code` context entry, when present.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self.context.get("code") {
            Some(ContextValue::String(code)) => Some(code),
            _ => None,
        }
    }
}

impl Serialize for ValidationIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.context.len() + 2))?;
        map.serialize_entry("path", &self.path)?;
        map.serialize_entry("message", &self.message)?;
        for (key, value) in &self.context {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Aggregate of validation issues returned by a failed parse.
///
/// Serializes as its issue list.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("schema validation failed: {}", summarize(.issues))]
pub struct SchemaError {
    issues: Vec<ValidationIssue>,
}

fn summarize(issues: &[ValidationIssue]) -> String {
    match issues {
        [] => "no issues reported".to_string(),
        [only] => describe_issue(only),
        [first, rest @ ..] => format!("{} (and {} more)", describe_issue(first), rest.len()),
    }
}

fn describe_issue(issue: &ValidationIssue) -> String {
    if issue.path.is_empty() {
        issue.message.clone()
    } else {
        let path: Vec<String> = issue.path.iter().map(ToString::to_string).collect();
        format!("{}: {}", path.join("."), issue.message)
    }
}

impl SchemaError {
    /// Creates an error from a list of issues.
    #[must_use]
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Creates an error with a single issue.
    #[must_use]
    pub fn single(issue: ValidationIssue) -> Self {
        Self::new(vec![issue])
    }

    /// Returns the issues in the order they were found.
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Consumes the error, returning its issues.
    #[must_use]
    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }

    /// Renders the issues as client-facing invalid parameters.
    #[must_use]
    pub fn invalid_parameters(&self) -> Vec<InvalidParameter> {
        extract_invalid_parameters(&self.issues)
    }
}

impl Serialize for SchemaError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.issues.len()))?;
        for issue in &self.issues {
            seq.serialize_element(issue)?;
        }
        seq.end()
    }
}
