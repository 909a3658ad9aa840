//! Schema that produces typed data via serde.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

use crate::schema::{PathSegment, Schema, SchemaError, ValidationIssue};
use crate::shape::ShapeSchema;

/// A [`ShapeSchema`] whose cleaned output is deserialized into `T`.
///
/// The shape check reports structural issues with full paths; deserialization
/// then enforces whatever `T` adds (enums, newtypes, custom `Deserialize`
/// impls). A deserialization failure is reported as a single issue.
///
/// ```
/// use covenant_core::{Schema, ShapeSchema};
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct Pet {
///     name: String,
/// }
///
/// let schema = ShapeSchema::object()
///     .field("name", ShapeSchema::string())
///     .typed::<Pet>();
/// let pet = schema.safe_parse(&json!({"name": "Rex"})).unwrap();
/// assert_eq!(pet.name, "Rex");
/// ```
pub struct TypedSchema<T> {
    shape: ShapeSchema,
    _output: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    /// Wraps a shape.
    #[must_use]
    pub fn new(shape: ShapeSchema) -> Self {
        Self {
            shape,
            _output: PhantomData,
        }
    }

    /// A schema relying on `T`'s `Deserialize` implementation alone.
    #[must_use]
    pub fn serde() -> Self {
        Self::new(ShapeSchema::any())
    }

    /// Returns the underlying shape.
    #[must_use]
    pub fn shape(&self) -> &ShapeSchema {
        &self.shape
    }
}

impl<T> Clone for TypedSchema<T> {
    fn clone(&self) -> Self {
        Self::new(self.shape.clone())
    }
}

impl<T> fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSchema")
            .field("output", &std::any::type_name::<T>())
            .field("shape", &self.shape)
            .finish()
    }
}

impl<T: DeserializeOwned> Schema for TypedSchema<T> {
    type Output = T;

    fn safe_parse(&self, input: &Value) -> Result<T, SchemaError> {
        let cleaned = self.shape.safe_parse(input)?;
        serde_json::from_value(cleaned).map_err(|e| SchemaError::single(issue_from_serde(&e)))
    }
}

fn issue_from_serde(error: &serde_json::Error) -> ValidationIssue {
    let message = error.to_string();
    if let Some(field) = backticked(&message, "missing field ") {
        return ValidationIssue::new(vec![PathSegment::Key(field)], "Required")
            .with_context("code", "invalid_type")
            .with_context("received", "undefined");
    }
    if let Some(field) = backticked(&message, "unknown field ") {
        return ValidationIssue::new(vec![PathSegment::Key(field)], message)
            .with_context("code", "unrecognized_keys");
    }
    ValidationIssue::new(Vec::new(), message).with_context("code", "custom")
}

/// Extracts `x` from messages shaped like ``"<prefix>`x`..."``.
fn backticked(message: &str, prefix: &str) -> Option<String> {
    let rest = message.strip_prefix(prefix)?.strip_prefix('`')?;
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Query {
        page: u32,
        order: Order,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Order {
        Asc,
        Desc,
    }

    #[test]
    fn test_shape_then_deserialize() {
        let schema = ShapeSchema::object()
            .field("page", ShapeSchema::integer().coerce().min(1.0))
            .field("order", ShapeSchema::string())
            .typed::<Query>();

        let query = schema
            .safe_parse(&json!({"page": "3", "order": "desc", "extra": "stripped"}))
            .unwrap();
        assert_eq!(query, Query { page: 3, order: Order::Desc });
    }

    #[test]
    fn test_whole_float_deserializes_as_integer() {
        let schema = ShapeSchema::object()
            .field("page", ShapeSchema::integer())
            .field("order", ShapeSchema::string())
            .typed::<Query>();

        let query = schema.safe_parse(&json!({"page": 2.0, "order": "asc"})).unwrap();
        assert_eq!(query, Query { page: 2, order: Order::Asc });

        let query = schema.safe_parse(&json!({"page": "2.0", "order": "asc"}));
        assert!(query.is_err());

        let coerced = ShapeSchema::object()
            .field("page", ShapeSchema::integer().coerce())
            .field("order", ShapeSchema::string())
            .typed::<Query>();
        let query = coerced.safe_parse(&json!({"page": "2.0", "order": "asc"})).unwrap();
        assert_eq!(query, Query { page: 2, order: Order::Asc });
    }

    #[test]
    fn test_shape_issues_take_precedence() {
        let schema = ShapeSchema::object()
            .field("page", ShapeSchema::integer().min(1.0))
            .field("order", ShapeSchema::string())
            .typed::<Query>();
        let error = schema.safe_parse(&json!({"page": 0, "order": "asc"})).unwrap_err();
        assert_eq!(error.issues()[0].code(), Some("too_small"));
    }

    #[test]
    fn test_serde_missing_field_is_pathed() {
        let error = TypedSchema::<Query>::serde()
            .safe_parse(&json!({"order": "asc"}))
            .unwrap_err();
        let issue = &error.issues()[0];
        assert_eq!(issue.path, vec![PathSegment::Key("page".into())]);
        assert_eq!(issue.message, "Required");
    }

    #[test]
    fn test_serde_unknown_field_is_pathed() {
        let error = TypedSchema::<Query>::serde()
            .safe_parse(&json!({"page": 1, "order": "asc", "limit": 5}))
            .unwrap_err();
        assert_eq!(error.issues()[0].path, vec![PathSegment::Key("limit".into())]);
        assert_eq!(error.issues()[0].code(), Some("unrecognized_keys"));
    }

    #[test]
    fn test_serde_other_failures_have_empty_path() {
        let error = TypedSchema::<Query>::serde()
            .safe_parse(&json!({"page": 1, "order": "sideways"}))
            .unwrap_err();
        assert!(error.issues()[0].path.is_empty());
        assert_eq!(error.issues()[0].code(), Some("custom"));
    }

    #[test]
    fn test_backticked() {
        assert_eq!(backticked("missing field `name`", "missing field "), Some("name".into()));
        assert_eq!(backticked("invalid type: string", "missing field "), None);
    }
}
