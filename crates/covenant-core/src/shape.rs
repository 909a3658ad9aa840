//! Structural schema over JSON values.
//!
//! [`ShapeSchema`] is a small, composable validator: a kind (string, integer,
//! object, ...) plus modifiers. Validation collects every issue with its path
//! instead of stopping at the first failure, and produces a cleaned copy of
//! the input (unknown object keys stripped, coerced scalars converted).
//!
//! Issue codes follow the widely used `invalid_type` / `too_small` /
//! `too_big` / `invalid_enum_value` / `unrecognized_keys` / `custom`
//! vocabulary so client tooling can branch on them.
//!
//! ```
//! use covenant_core::{Schema, ShapeSchema};
//! use serde_json::json;
//!
//! let schema = ShapeSchema::object()
//!     .field("name", ShapeSchema::string().min_length(1))
//!     .field("tag", ShapeSchema::string().optional());
//!
//! let pet = schema.safe_parse(&json!({"name": "Rex", "age": 3})).unwrap();
//! assert_eq!(pet, json!({"name": "Rex"}));
//!
//! let error = schema.safe_parse(&json!({})).unwrap_err();
//! assert_eq!(error.issues()[0].message, "Required");
//! ```

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::Arc;

use crate::schema::{ContextValue, PathSegment, Schema, SchemaError, ValidationIssue};
use crate::typed::TypedSchema;

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A structural validator for [`Value`]s.
#[derive(Clone)]
pub struct ShapeSchema {
    kind: Kind,
    optional: bool,
    nullable: bool,
    coerce: bool,
    refinements: Vec<Refinement>,
}

#[derive(Debug, Clone)]
enum Kind {
    Any,
    String { min_length: Option<usize>, max_length: Option<usize> },
    Integer { min: Option<f64>, max: Option<f64> },
    Number { min: Option<f64>, max: Option<f64> },
    Boolean,
    OneOf(Vec<String>),
    Array { item: Box<ShapeSchema>, min_length: Option<usize>, max_length: Option<usize> },
    Object { fields: Vec<(String, ShapeSchema)>, strict: bool },
}

#[derive(Clone)]
struct Refinement {
    predicate: Predicate,
    message: String,
}

impl fmt::Debug for ShapeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeSchema")
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .field("nullable", &self.nullable)
            .field("coerce", &self.coerce)
            .field("refinements", &self.refinements.len())
            .finish()
    }
}

impl ShapeSchema {
    fn of(kind: Kind) -> Self {
        Self {
            kind,
            optional: false,
            nullable: false,
            coerce: false,
            refinements: Vec::new(),
        }
    }

    /// Accepts any value, including `null`.
    #[must_use]
    pub fn any() -> Self {
        Self::of(Kind::Any)
    }

    /// Accepts strings.
    #[must_use]
    pub fn string() -> Self {
        Self::of(Kind::String {
            min_length: None,
            max_length: None,
        })
    }

    /// Accepts integral numbers.
    #[must_use]
    pub fn integer() -> Self {
        Self::of(Kind::Integer { min: None, max: None })
    }

    /// Accepts any finite number.
    #[must_use]
    pub fn number() -> Self {
        Self::of(Kind::Number { min: None, max: None })
    }

    /// Accepts booleans.
    #[must_use]
    pub fn boolean() -> Self {
        Self::of(Kind::Boolean)
    }

    /// Accepts one of the given string literals.
    #[must_use]
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(Kind::OneOf(values.into_iter().map(Into::into).collect()))
    }

    /// Accepts arrays whose items match `item`.
    #[must_use]
    pub fn array(item: ShapeSchema) -> Self {
        Self::of(Kind::Array {
            item: Box::new(item),
            min_length: None,
            max_length: None,
        })
    }

    /// Accepts objects. Declare members with [`field`](Self::field).
    ///
    /// Undeclared members are stripped from the output unless the schema is
    /// [`strict`](Self::strict).
    #[must_use]
    pub fn object() -> Self {
        Self::of(Kind::Object {
            fields: Vec::new(),
            strict: false,
        })
    }

    /// Declares an object member. No effect on non-object schemas.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, schema: ShapeSchema) -> Self {
        if let Kind::Object { fields, .. } = &mut self.kind {
            let name = name.into();
            fields.retain(|(existing, _)| *existing != name);
            fields.push((name, schema));
        }
        self
    }

    /// Rejects undeclared object members.
    #[must_use]
    pub fn strict(mut self) -> Self {
        if let Kind::Object { strict, .. } = &mut self.kind {
            *strict = true;
        }
        self
    }

    /// Allows the value to be absent.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Allows the value to be `null`.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Converts string input to the declared scalar kind before checking.
    ///
    /// Query strings and headers only carry text; coercion lets the same
    /// schema describe `?page=2` and `{"page": 2}`. Arrays additionally wrap
    /// a single value, so `?tag=a` and `?tag=a&tag=b` both validate.
    #[must_use]
    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        if let Kind::Array { item, .. } = &mut self.kind {
            item.coerce = true;
        }
        self
    }

    /// Minimum length for strings and arrays.
    #[must_use]
    pub fn min_length(mut self, n: usize) -> Self {
        match &mut self.kind {
            Kind::String { min_length, .. } | Kind::Array { min_length, .. } => {
                *min_length = Some(n);
            }
            _ => {}
        }
        self
    }

    /// Maximum length for strings and arrays.
    #[must_use]
    pub fn max_length(mut self, n: usize) -> Self {
        match &mut self.kind {
            Kind::String { max_length, .. } | Kind::Array { max_length, .. } => {
                *max_length = Some(n);
            }
            _ => {}
        }
        self
    }

    /// Inclusive lower bound for numbers.
    #[must_use]
    pub fn min(mut self, n: f64) -> Self {
        if let Kind::Integer { min, .. } | Kind::Number { min, .. } = &mut self.kind {
            *min = Some(n);
        }
        self
    }

    /// Inclusive upper bound for numbers.
    #[must_use]
    pub fn max(mut self, n: f64) -> Self {
        if let Kind::Integer { max, .. } | Kind::Number { max, .. } = &mut self.kind {
            *max = Some(n);
        }
        self
    }

    /// Adds a custom check, run after the structural checks pass.
    #[must_use]
    pub fn refine<F>(mut self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.refinements.push(Refinement {
            predicate: Arc::new(predicate),
            message: message.into(),
        });
        self
    }

    /// Wraps this schema so its output is deserialized into `T`.
    #[must_use]
    pub fn typed<T>(self) -> TypedSchema<T> {
        TypedSchema::new(self)
    }

    /// Returns `true` if the value may be absent.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    fn expected(&self) -> &'static str {
        match &self.kind {
            Kind::Any => "any",
            Kind::String { .. } | Kind::OneOf(_) => "string",
            Kind::Integer { .. } => "integer",
            Kind::Number { .. } => "number",
            Kind::Boolean => "boolean",
            Kind::Array { .. } => "array",
            Kind::Object { .. } => "object",
        }
    }

    /// Validates `value`, appending issues. Returns the cleaned value, or
    /// `None` when the value is absent or invalid.
    fn check(
        &self,
        value: Option<&Value>,
        path: &mut Vec<PathSegment>,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<Value> {
        let value = match value {
            None if self.optional || matches!(self.kind, Kind::Any) => return None,
            None => {
                issues.push(
                    invalid_type(path, self.expected(), "undefined").with_message("Required"),
                );
                return None;
            }
            Some(value) => value,
        };

        if value.is_null() && (self.nullable || matches!(self.kind, Kind::Any)) {
            return Some(Value::Null);
        }

        let before = issues.len();
        let cleaned = self.check_kind(value, path, issues)?;
        if issues.len() != before {
            return None;
        }

        for refinement in &self.refinements {
            if !(refinement.predicate)(&cleaned) {
                issues.push(
                    ValidationIssue::new(path.clone(), refinement.message.clone())
                        .with_context("code", "custom")
                        .with_context("validator", ContextValue::Opaque("refinement")),
                );
            }
        }
        if issues.len() == before {
            Some(cleaned)
        } else {
            None
        }
    }

    fn check_kind(
        &self,
        value: &Value,
        path: &mut Vec<PathSegment>,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<Value> {
        match &self.kind {
            Kind::Any => Some(value.clone()),
            Kind::String {
                min_length,
                max_length,
            } => {
                let Some(s) = value.as_str() else {
                    issues.push(invalid_type(path, "string", received(value)));
                    return None;
                };
                let len = s.chars().count();
                check_length(path, issues, "string", len, *min_length, *max_length);
                Some(value.clone())
            }
            Kind::Integer { min, max } => {
                let value = self.coerce_scalar(value, parse_number);
                let Some(n) = value.as_f64().filter(|_| value.is_number()) else {
                    issues.push(invalid_type(path, "integer", received(&value)));
                    return None;
                };
                if !(value.is_i64() || value.is_u64()) && n.fract() != 0.0 {
                    issues.push(invalid_type(path, "integer", "float"));
                    return None;
                }
                check_bounds(path, issues, n, *min, *max);
                Some(integral(value, n))
            }
            Kind::Number { min, max } => {
                let value = self.coerce_scalar(value, parse_number);
                let Some(n) = value.as_f64().filter(|_| value.is_number()) else {
                    issues.push(invalid_type(path, "number", received(&value)));
                    return None;
                };
                check_bounds(path, issues, n, *min, *max);
                Some(value)
            }
            Kind::Boolean => {
                let value = self.coerce_scalar(value, parse_bool);
                if value.is_boolean() {
                    Some(value)
                } else {
                    issues.push(invalid_type(path, "boolean", received(&value)));
                    None
                }
            }
            Kind::OneOf(options) => {
                let Some(s) = value.as_str() else {
                    issues.push(invalid_type(path, "string", received(value)));
                    return None;
                };
                if options.iter().any(|option| option == s) {
                    return Some(value.clone());
                }
                let quoted: Vec<String> = options.iter().map(|o| format!("'{o}'")).collect();
                issues.push(
                    ValidationIssue::new(
                        path.clone(),
                        format!(
                            "Invalid enum value. Expected {}, received '{s}'",
                            quoted.join(" | ")
                        ),
                    )
                    .with_context("code", "invalid_enum_value")
                    .with_context(
                        "options",
                        options
                            .iter()
                            .map(|o| ContextValue::from(o.as_str()))
                            .collect::<Vec<_>>(),
                    )
                    .with_context("received", s),
                );
                None
            }
            Kind::Array {
                item,
                min_length,
                max_length,
            } => {
                let wrapped;
                let items = match value {
                    Value::Array(items) => items,
                    other if self.coerce => {
                        wrapped = vec![other.clone()];
                        &wrapped
                    }
                    other => {
                        issues.push(invalid_type(path, "array", received(other)));
                        return None;
                    }
                };
                let mut out = Vec::with_capacity(items.len());
                for (index, element) in items.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    if let Some(cleaned) = item.check(Some(element), path, issues) {
                        out.push(cleaned);
                    }
                    path.pop();
                }
                check_length(path, issues, "array", items.len(), *min_length, *max_length);
                Some(Value::Array(out))
            }
            Kind::Object { fields, strict } => {
                let Value::Object(members) = value else {
                    issues.push(invalid_type(path, "object", received(value)));
                    return None;
                };
                let mut out = Map::new();
                for (name, schema) in fields {
                    path.push(PathSegment::Key(name.clone()));
                    if let Some(cleaned) = schema.check(members.get(name), path, issues) {
                        out.insert(name.clone(), cleaned);
                    }
                    path.pop();
                }
                if *strict {
                    let unknown: Vec<&String> = members
                        .keys()
                        .filter(|key| !fields.iter().any(|(name, _)| name == *key))
                        .collect();
                    if !unknown.is_empty() {
                        let quoted: Vec<String> =
                            unknown.iter().map(|key| format!("'{key}'")).collect();
                        issues.push(
                            ValidationIssue::new(
                                path.clone(),
                                format!("Unrecognized key(s) in object: {}", quoted.join(", ")),
                            )
                            .with_context("code", "unrecognized_keys")
                            .with_context(
                                "keys",
                                unknown
                                    .iter()
                                    .map(|key| ContextValue::from(key.as_str()))
                                    .collect::<Vec<_>>(),
                            ),
                        );
                    }
                }
                Some(Value::Object(out))
            }
        }
    }

    fn coerce_scalar(&self, value: &Value, parse: fn(&str) -> Option<Value>) -> Value {
        if self.coerce {
            if let Some(parsed) = value.as_str().and_then(|s| parse(s.trim())) {
                return parsed;
            }
        }
        value.clone()
    }
}

impl Schema for ShapeSchema {
    type Output = Value;

    fn safe_parse(&self, input: &Value) -> Result<Value, SchemaError> {
        let mut issues = Vec::new();
        let output = self.check(Some(input), &mut Vec::new(), &mut issues);
        if issues.is_empty() {
            Ok(output.unwrap_or(Value::Null))
        } else {
            Err(SchemaError::new(issues))
        }
    }
}

trait IssueExt {
    fn with_message(self, message: &str) -> Self;
}

impl IssueExt for ValidationIssue {
    fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }
}

fn invalid_type(path: &[PathSegment], expected: &str, received: &str) -> ValidationIssue {
    ValidationIssue::new(
        path.to_vec(),
        format!("Expected {expected}, received {received}"),
    )
    .with_context("code", "invalid_type")
    .with_context("expected", expected)
    .with_context("received", received)
}

fn received(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_length(
    path: &[PathSegment],
    issues: &mut Vec<ValidationIssue>,
    type_name: &str,
    len: usize,
    min_length: Option<usize>,
    max_length: Option<usize>,
) {
    let unit = if type_name == "array" {
        "element(s)"
    } else {
        "character(s)"
    };
    let label = if type_name == "array" { "Array" } else { "String" };
    if let Some(min) = min_length.filter(|min| len < *min) {
        issues.push(
            ValidationIssue::new(
                path.to_vec(),
                format!("{label} must contain at least {min} {unit}"),
            )
            .with_context("code", "too_small")
            .with_context("minimum", min)
            .with_context("inclusive", true)
            .with_context("type", type_name),
        );
    }
    if let Some(max) = max_length.filter(|max| len > *max) {
        issues.push(
            ValidationIssue::new(
                path.to_vec(),
                format!("{label} must contain at most {max} {unit}"),
            )
            .with_context("code", "too_big")
            .with_context("maximum", max)
            .with_context("inclusive", true)
            .with_context("type", type_name),
        );
    }
}

fn check_bounds(
    path: &[PathSegment],
    issues: &mut Vec<ValidationIssue>,
    n: f64,
    min: Option<f64>,
    max: Option<f64>,
) {
    if let Some(min) = min.filter(|min| n < *min) {
        issues.push(
            ValidationIssue::new(
                path.to_vec(),
                format!("Number must be greater than or equal to {min}"),
            )
            .with_context("code", "too_small")
            .with_context("minimum", min)
            .with_context("inclusive", true)
            .with_context("type", "number"),
        );
    }
    if let Some(max) = max.filter(|max| n > *max) {
        issues.push(
            ValidationIssue::new(
                path.to_vec(),
                format!("Number must be less than or equal to {max}"),
            )
            .with_context("code", "too_big")
            .with_context("maximum", max)
            .with_context("inclusive", true)
            .with_context("type", "number"),
        );
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn parse_bool(s: &str) -> Option<Value> {
    match s {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => None,
    }
}

/// Convenience for building object schemas from `(name, schema)` pairs.
impl FromIterator<(String, ShapeSchema)> for ShapeSchema {
    fn from_iter<I: IntoIterator<Item = (String, ShapeSchema)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::object(), |schema, (name, field)| schema.field(name, field))
    }
}

impl From<IndexMap<String, ShapeSchema>> for ShapeSchema {
    fn from(fields: IndexMap<String, ShapeSchema>) -> Self {
        fields.into_iter().collect()
    }
}

/// Rewrites a whole float such as `2.0` as the integer `2`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integral(value: Value, n: f64) -> Value {
    if value.is_i64() || value.is_u64() {
        value
    } else if n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::from(n as i64)
    } else if n >= 0.0 && n < u64::MAX as f64 {
        Value::from(n as u64)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pet() -> ShapeSchema {
        ShapeSchema::object()
            .field("name", ShapeSchema::string().min_length(1).max_length(20))
            .field("tag", ShapeSchema::string().optional())
            .field("vaccinations", ShapeSchema::array(ShapeSchema::object().field("name", ShapeSchema::string())).optional())
    }

    #[test]
    fn test_valid_object_strips_unknown_keys() {
        let output = pet().safe_parse(&json!({"name": "Rex", "id": 7})).unwrap();
        assert_eq!(output, json!({"name": "Rex"}));
    }

    #[test]
    fn test_missing_required_field() {
        let error = pet().safe_parse(&json!({})).unwrap_err();
        let issue = &error.issues()[0];
        assert_eq!(issue.path, vec![PathSegment::Key("name".into())]);
        assert_eq!(issue.message, "Required");
        assert_eq!(issue.code(), Some("invalid_type"));
        assert_eq!(issue.context["received"], ContextValue::from("undefined"));
    }

    #[test]
    fn test_nested_paths_include_indexes() {
        let error = pet()
            .safe_parse(&json!({"name": "Rex", "vaccinations": [{"name": "rabies"}, {"name": 5}]}))
            .unwrap_err();
        assert_eq!(
            error.issues()[0].path,
            vec![
                PathSegment::Key("vaccinations".into()),
                PathSegment::Index(1),
                PathSegment::Key("name".into())
            ]
        );
        assert_eq!(error.issues()[0].message, "Expected string, received number");
    }

    #[test]
    fn test_collects_all_issues() {
        let schema = ShapeSchema::object()
            .field("a", ShapeSchema::integer())
            .field("b", ShapeSchema::boolean());
        let error = schema.safe_parse(&json!({"a": "x", "b": 1})).unwrap_err();
        assert_eq!(error.issues().len(), 2);
    }

    #[test]
    fn test_string_length_bounds() {
        let error = pet().safe_parse(&json!({"name": ""})).unwrap_err();
        let issue = &error.issues()[0];
        assert_eq!(issue.code(), Some("too_small"));
        assert_eq!(issue.message, "String must contain at least 1 character(s)");
    }

    #[test]
    fn test_integer_rejects_float() {
        let error = ShapeSchema::integer().safe_parse(&json!(1.5)).unwrap_err();
        assert_eq!(error.issues()[0].message, "Expected integer, received float");
        assert!(ShapeSchema::integer().safe_parse(&json!(3)).is_ok());
    }

    #[test]
    fn test_integer_normalizes_whole_floats() {
        let schema = ShapeSchema::object().field("page", ShapeSchema::integer());
        let output = schema.safe_parse(&json!({"page": 2.0})).unwrap();
        assert_eq!(output, json!({"page": 2}));
        assert!(output["page"].is_i64());

        let output = ShapeSchema::integer().safe_parse(&json!(-4.0)).unwrap();
        assert_eq!(output.as_i64(), Some(-4));
    }

    #[test]
    fn test_number_bounds() {
        let schema = ShapeSchema::number().min(1.0).max(10.0);
        assert!(schema.safe_parse(&json!(5)).is_ok());
        let error = schema.safe_parse(&json!(11)).unwrap_err();
        assert_eq!(error.issues()[0].code(), Some("too_big"));
    }

    #[test]
    fn test_coercion_from_strings() {
        let schema = ShapeSchema::object()
            .field("page", ShapeSchema::integer().coerce())
            .field("archived", ShapeSchema::boolean().coerce().optional())
            .field("tags", ShapeSchema::array(ShapeSchema::string()).coerce().optional());
        let output = schema
            .safe_parse(&json!({"page": "2", "archived": "false", "tags": "a"}))
            .unwrap();
        assert_eq!(output, json!({"page": 2, "archived": false, "tags": ["a"]}));

        let error = schema.safe_parse(&json!({"page": "two"})).unwrap_err();
        assert_eq!(error.issues()[0].message, "Expected integer, received string");
    }

    #[test]
    fn test_strict_rejects_unknown_keys() {
        let schema = ShapeSchema::object().field("a", ShapeSchema::any()).strict();
        let error = schema.safe_parse(&json!({"a": 1, "b": 2, "c": 3})).unwrap_err();
        let issue = &error.issues()[0];
        assert_eq!(issue.code(), Some("unrecognized_keys"));
        assert_eq!(issue.message, "Unrecognized key(s) in object: 'b', 'c'");
        assert!(issue.path.is_empty());
    }

    #[test]
    fn test_one_of() {
        let schema = ShapeSchema::one_of(["asc", "desc"]);
        assert!(schema.safe_parse(&json!("asc")).is_ok());
        let error = schema.safe_parse(&json!("up")).unwrap_err();
        assert_eq!(
            error.issues()[0].message,
            "Invalid enum value. Expected 'asc' | 'desc', received 'up'"
        );
    }

    #[test]
    fn test_nullable() {
        assert!(ShapeSchema::string().nullable().safe_parse(&Value::Null).is_ok());
        let error = ShapeSchema::string().safe_parse(&Value::Null).unwrap_err();
        assert_eq!(error.issues()[0].message, "Expected string, received null");
    }

    #[test]
    fn test_refinement_adds_custom_issue_with_opaque_validator() {
        let schema = ShapeSchema::string().refine(
            |value| value.as_str().is_some_and(|s| s.starts_with('+')),
            "Phone numbers start with +",
        );
        let error = schema.safe_parse(&json!("0123")).unwrap_err();
        let issue = &error.issues()[0];
        assert_eq!(issue.code(), Some("custom"));
        assert!(matches!(issue.context["validator"], ContextValue::Opaque(_)));
    }

    #[test]
    fn test_refinement_skipped_when_structure_invalid() {
        let schema = ShapeSchema::string().refine(|_| false, "never");
        let error = schema.safe_parse(&json!(1)).unwrap_err();
        assert_eq!(error.issues().len(), 1);
        assert_eq!(error.issues()[0].code(), Some("invalid_type"));
    }

    #[test]
    fn test_from_index_map() {
        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), ShapeSchema::integer());
        let schema = ShapeSchema::from(fields);
        assert!(schema.safe_parse(&json!({"id": 1})).is_ok());
        assert!(schema.safe_parse(&json!({})).is_err());
    }
}
