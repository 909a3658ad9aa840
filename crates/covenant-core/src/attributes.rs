//! Request attributes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute holding the negotiated request content type.
pub const CONTENT_TYPE: &str = "contentType";

/// Attribute holding the negotiated response media type.
pub const ACCEPT: &str = "accept";

/// Attribute holding the negotiated response language.
pub const ACCEPT_LANGUAGE: &str = "accept-language";

/// Append-only bag of values attached to a request by middleware.
///
/// Stages never mutate a bag they were handed: [`with`](Self::with) returns
/// a new bag containing every existing entry plus the new one.
///
/// ```
/// use covenant_core::{Attributes, ACCEPT};
///
/// let empty = Attributes::new();
/// let negotiated = empty.with(ACCEPT, "application/json");
/// assert!(empty.get(ACCEPT).is_none());
/// assert_eq!(negotiated.get_str(ACCEPT), Some("application/json"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(IndexMap<String, Value>);

impl Attributes {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this bag with `key` set to `value`.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.0.clone();
        next.insert(key.into(), value.into());
        Self(next)
    }

    /// Returns an attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a string attribute.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns `true` if the attribute is set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Renders the bag as a JSON object, the input of attribute schemas.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_keeps_existing_entries() {
        let first = Attributes::new().with(CONTENT_TYPE, "application/json");
        let second = first.with(ACCEPT_LANGUAGE, "en");
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(second.get_str(CONTENT_TYPE), Some("application/json"));
    }

    #[test]
    fn test_to_value_preserves_order() {
        let attributes: Attributes = [("b", json!(1)), ("a", json!("x"))].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&attributes.to_value()).unwrap(),
            r#"{"b":1,"a":"x"}"#
        );
    }
}
