//! Form / query-string parsing with bracket notation.
//!
//! `serde_urlencoded` handles percent-decoding into flat pairs; keys are then
//! expanded into nested values the way HTML form libraries do:
//!
//! | input              | output                     |
//! |--------------------|----------------------------|
//! | `a=1`              | `{"a": "1"}`               |
//! | `a=1&a=2`          | `{"a": ["1", "2"]}`        |
//! | `a[]=1&a[]=2`      | `{"a": ["1", "2"]}`        |
//! | `a[0][b]=1`        | `{"a": [{"b": "1"}]}`      |
//! | `a[b][c]=1`        | `{"a": {"b": {"c": "1"}}}` |
//!
//! Nesting stops after [`MAX_DEPTH`] bracket segments; the rest of the key
//! becomes a single literal member.
//!
//! All leaves are strings; schemas coerce them.

use serde_json::{Map, Value};

/// Parses a query string into a nested object.
pub fn parse_query(query: &str) -> Result<Value, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
    Ok(expand_pairs(pairs))
}

/// Expands flat `(key, value)` pairs using bracket notation.
#[must_use]
pub fn expand_pairs<I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut root = Value::Object(Map::new());
    for (key, value) in pairs {
        let segments = split_key(&key);
        assign(&mut root, &segments, value);
    }
    root
}

/// Flattens an object into pairs, the inverse of [`expand_pairs`].
///
/// Arrays use indexed keys (`a[0]`), nested objects `a[b]`, `null` an empty
/// value.
#[must_use]
pub fn flatten_query(object: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in object {
        flatten_into(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_into(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => pairs.push((prefix, String::new())),
        Value::Bool(b) => pairs.push((prefix, b.to_string())),
        Value::Number(n) => pairs.push((prefix, n.to_string())),
        Value::String(s) => pairs.push((prefix, s.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(format!("{prefix}[{index}]"), item, pairs);
            }
        }
        Value::Object(members) => {
            for (key, member) in members {
                flatten_into(format!("{prefix}[{key}]"), member, pairs);
            }
        }
    }
}

/// Bracket segments expanded per key; deeper text stays one literal segment.
pub const MAX_DEPTH: usize = 5;

/// Splits `a[b][]` into `["a", "b", ""]`. Malformed keys stay literal.
///
/// Past [`MAX_DEPTH`] bracket segments the remainder is kept verbatim as a
/// final segment: `a[1][2][3][4][5][6][7]` gives
/// `["a", "1", "2", "3", "4", "5", "[6][7]"]`.
fn split_key(key: &str) -> Vec<String> {
    let open = match key.find('[') {
        Some(open) if open > 0 => open,
        _ => return vec![key.to_string()],
    };
    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while segments.len() <= MAX_DEPTH {
        let Some(stripped) = rest.strip_prefix('[') else {
            break;
        };
        let Some(close) = stripped.find(']') else {
            break;
        };
        segments.push(stripped[..close].to_string());
        rest = &stripped[close + 1..];
    }
    if rest.is_empty() {
        segments
    } else if segments.len() > MAX_DEPTH && is_bracketed(rest) {
        segments.push(rest.to_string());
        segments
    } else {
        vec![key.to_string()]
    }
}

/// True for text made only of `[..]` groups, like `[6][7]`.
fn is_bracketed(mut rest: &str) -> bool {
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return false;
        };
        rest = &stripped[close + 1..];
    }
    rest.is_empty()
}

fn is_positional(segment: &str) -> bool {
    segment.is_empty() || segment.parse::<usize>().is_ok()
}

fn assign(node: &mut Value, segments: &[String], value: String) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };
    let slot = slot(node, segment);

    if rest.is_empty() {
        match slot {
            Value::Null => *slot = Value::String(value),
            Value::Array(items) => items.push(Value::String(value)),
            existing => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, Value::String(value)]);
            }
        }
        return;
    }

    if !(slot.is_array() || slot.is_object()) {
        *slot = if is_positional(&rest[0]) {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        };
    }
    assign(slot, rest, value);
}

/// Returns the child of `node` addressed by `segment`, creating it as `null`.
fn slot<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    if let Value::Array(items) = node {
        if !is_positional(segment) {
            let members = std::mem::take(items)
                .into_iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item))
                .collect();
            *node = Value::Object(members);
        }
    } else if !node.is_object() {
        *node = Value::Object(Map::new());
    }

    match node {
        Value::Array(items) => {
            let index = segment
                .parse::<usize>()
                .ok()
                .filter(|index| *index < items.len())
                .unwrap_or_else(|| {
                    items.push(Value::Null);
                    items.len() - 1
                });
            &mut items[index]
        }
        Value::Object(members) => members.entry(segment.to_string()).or_insert(Value::Null),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_pairs() {
        assert_eq!(parse_query("").unwrap(), json!({}));
        assert_eq!(
            parse_query("page=2&q=hello%20world").unwrap(),
            json!({"page": "2", "q": "hello world"})
        );
    }

    #[test]
    fn test_repeated_keys_collect() {
        assert_eq!(
            parse_query("tag=a&tag=b&tag=c").unwrap(),
            json!({"tag": ["a", "b", "c"]})
        );
    }

    #[test]
    fn test_bracket_notation() {
        assert_eq!(
            parse_query("tags[]=a&tags[]=b").unwrap(),
            json!({"tags": ["a", "b"]})
        );
        assert_eq!(
            parse_query("filter%5Bname%5D=rex&filter[age][min]=2").unwrap(),
            json!({"filter": {"name": "rex", "age": {"min": "2"}}})
        );
        assert_eq!(
            parse_query("items[0][id]=1&items[0][qty]=2&items[1][id]=3").unwrap(),
            json!({"items": [{"id": "1", "qty": "2"}, {"id": "3"}]})
        );
    }

    #[test]
    fn test_mixed_positional_and_named_becomes_object() {
        assert_eq!(
            parse_query("a[]=x&a[b]=y").unwrap(),
            json!({"a": {"0": "x", "b": "y"}})
        );
    }

    #[test]
    fn test_malformed_keys_stay_literal() {
        assert_eq!(parse_query("a[b=1").unwrap(), json!({"a[b": "1"}));
        assert_eq!(parse_query("[x]=1").unwrap(), json!({"[x]": "1"}));
        assert_eq!(parse_query("a[b]c=1").unwrap(), json!({"a[b]c": "1"}));
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        assert_eq!(
            parse_query("a[1][2][3][4][5][6][7]=x").unwrap(),
            json!({"a": {"1": {"2": {"3": {"4": {"5": {"[6][7]": "x"}}}}}}})
        );
        assert_eq!(
            parse_query("a[1][2][3][4][5][6]c=x").unwrap(),
            json!({"a[1][2][3][4][5][6]c": "x"})
        );
    }

    #[test]
    fn test_very_deep_key_does_not_recurse() {
        let key = format!("a{}", "[b]".repeat(20_000));
        let value = expand_pairs([(key, "1".to_string())]);

        let mut node = &value["a"];
        for _ in 0..MAX_DEPTH {
            node = &node["b"];
        }
        let Value::Object(members) = node else {
            panic!("expected an object at the depth limit, got {node}");
        };
        let (literal, leaf) = members.iter().next().unwrap();
        assert_eq!(literal.len(), 3 * (20_000 - MAX_DEPTH));
        assert_eq!(leaf, &json!("1"));
    }

    #[test]
    fn test_flatten_then_expand() {
        let object = json!({
            "name": "rex",
            "tags": ["a", "b"],
            "owner": {"id": 1, "vip": true},
        });
        let Value::Object(members) = &object else {
            unreachable!()
        };
        let pairs = flatten_query(members);
        assert_eq!(pairs[1], ("tags[0]".to_string(), "a".to_string()));
        assert_eq!(
            expand_pairs(pairs),
            json!({
                "name": "rex",
                "tags": ["a", "b"],
                "owner": {"id": "1", "vip": "true"},
            })
        );
    }
}
