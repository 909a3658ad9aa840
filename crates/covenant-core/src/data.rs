//! Data normalizer: arbitrary values to wire values.
//!
//! [`value_to_data`] walks any [`Serialize`] value and produces a
//! [`serde_json::Value`] that every text codec can represent:
//!
//! - `Option::None` marks an absent value. Absent map members and sequence
//!   elements are dropped; a top-level absent value becomes `null`.
//! - Unit and unit structs become `null`, unit enum variants their name.
//! - Timestamps render through their `Serialize` impl, the same RFC 3339
//!   form as [`render_timestamp`](crate::schema::render_timestamp), and a
//!   [`SchemaError`](crate::SchemaError) becomes its issue list.
//! - Byte buffers, non-string map keys, non-finite floats and integers
//!   outside the 64-bit range are rejected with
//!   [`DataError::UnsupportedType`].
//!
//! The output contains no absent values, so normalizing it again yields the
//! same value.

use serde::ser::{self, Impossible, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt::Display;
use thiserror::Error;

/// Failure to normalize a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// The value contains a kind with no wire representation.
    #[error("unsupported value type: {0}")]
    UnsupportedType(String),

    /// The value's `Serialize` implementation reported an error.
    #[error("{0}")]
    Custom(String),
}

impl ser::Error for DataError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

/// Normalizes `value` into a wire value.
///
/// ```
/// use covenant_core::value_to_data;
/// use serde::Serialize;
/// use serde_json::json;
///
/// #[derive(Serialize)]
/// struct Pet {
///     name: String,
///     tag: Option<String>,
///     scores: Vec<Option<u8>>,
/// }
///
/// let pet = Pet { name: "Rex".into(), tag: None, scores: vec![Some(1), None, Some(3)] };
/// assert_eq!(value_to_data(&pet).unwrap(), json!({"name": "Rex", "scores": [1, 3]}));
/// ```
pub fn value_to_data<T: Serialize + ?Sized>(value: &T) -> Result<Value, DataError> {
    Ok(value.serialize(DataSerializer)?.unwrap_or(Value::Null))
}

fn unsupported(kind: &str) -> DataError {
    DataError::UnsupportedType(kind.to_string())
}

/// Serializer whose output is `None` for absent values.
struct DataSerializer;

type Data = Option<Value>;

impl ser::Serializer for DataSerializer {
    type Ok = Data;
    type Error = DataError;

    type SerializeSeq = SeqData;
    type SerializeTuple = SeqData;
    type SerializeTupleStruct = SeqData;
    type SerializeTupleVariant = VariantData<SeqData>;
    type SerializeMap = MapData;
    type SerializeStruct = MapData;
    type SerializeStructVariant = VariantData<MapData>;

    fn serialize_bool(self, v: bool) -> Result<Data, DataError> {
        Ok(Some(Value::Bool(v)))
    }

    fn serialize_i8(self, v: i8) -> Result<Data, DataError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Data, DataError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Data, DataError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Data, DataError> {
        Ok(Some(Value::Number(v.into())))
    }

    fn serialize_i128(self, v: i128) -> Result<Data, DataError> {
        if let Ok(v) = i64::try_from(v) {
            self.serialize_i64(v)
        } else if let Ok(v) = u64::try_from(v) {
            self.serialize_u64(v)
        } else {
            Err(unsupported("i128"))
        }
    }

    fn serialize_u8(self, v: u8) -> Result<Data, DataError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Data, DataError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Data, DataError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Data, DataError> {
        Ok(Some(Value::Number(v.into())))
    }

    fn serialize_u128(self, v: u128) -> Result<Data, DataError> {
        u64::try_from(v)
            .map_err(|_| unsupported("u128"))
            .and_then(|v| self.serialize_u64(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Data, DataError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Data, DataError> {
        Number::from_f64(v)
            .map(|n| Some(Value::Number(n)))
            .ok_or_else(|| unsupported("non-finite float"))
    }

    fn serialize_char(self, v: char) -> Result<Data, DataError> {
        Ok(Some(Value::String(v.to_string())))
    }

    fn serialize_str(self, v: &str) -> Result<Data, DataError> {
        Ok(Some(Value::String(v.to_string())))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Data, DataError> {
        Err(unsupported("bytes"))
    }

    fn serialize_none(self) -> Result<Data, DataError> {
        Ok(None)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Data, DataError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Data, DataError> {
        Ok(Some(Value::Null))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Data, DataError> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Data, DataError> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Data, DataError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Data, DataError> {
        let mut map = Map::new();
        if let Some(inner) = value.serialize(DataSerializer)? {
            map.insert(variant.to_string(), inner);
        }
        Ok(Some(Value::Object(map)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqData, DataError> {
        Ok(SeqData {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqData, DataError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqData, DataError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantData<SeqData>, DataError> {
        Ok(VariantData {
            variant,
            inner: self.serialize_seq(Some(len))?,
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapData, DataError> {
        Ok(MapData {
            map: Map::new(),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapData, DataError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantData<MapData>, DataError> {
        Ok(VariantData {
            variant,
            inner: self.serialize_map(Some(len))?,
        })
    }
}

struct SeqData {
    items: Vec<Value>,
}

impl SeqData {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DataError> {
        if let Some(item) = value.serialize(DataSerializer)? {
            self.items.push(item);
        }
        Ok(())
    }

    fn finish(self) -> Value {
        Value::Array(self.items)
    }
}

impl ser::SerializeSeq for SeqData {
    type Ok = Data;
    type Error = DataError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DataError> {
        self.push(value)
    }

    fn end(self) -> Result<Data, DataError> {
        Ok(Some(self.finish()))
    }
}

impl ser::SerializeTuple for SeqData {
    type Ok = Data;
    type Error = DataError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DataError> {
        self.push(value)
    }

    fn end(self) -> Result<Data, DataError> {
        Ok(Some(self.finish()))
    }
}

impl ser::SerializeTupleStruct for SeqData {
    type Ok = Data;
    type Error = DataError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DataError> {
        self.push(value)
    }

    fn end(self) -> Result<Data, DataError> {
        Ok(Some(self.finish()))
    }
}

struct MapData {
    map: Map<String, Value>,
    next_key: Option<String>,
}

impl MapData {
    fn insert<T: Serialize + ?Sized>(&mut self, key: String, value: &T) -> Result<(), DataError> {
        if let Some(value) = value.serialize(DataSerializer)? {
            self.map.insert(key, value);
        }
        Ok(())
    }

    fn finish(self) -> Value {
        Value::Object(self.map)
    }
}

impl ser::SerializeMap for MapData {
    type Ok = Data;
    type Error = DataError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), DataError> {
        self.next_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DataError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| DataError::Custom("map value serialized before its key".into()))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<Data, DataError> {
        Ok(Some(self.finish()))
    }
}

impl ser::SerializeStruct for MapData {
    type Ok = Data;
    type Error = DataError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), DataError> {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Data, DataError> {
        Ok(Some(self.finish()))
    }
}

/// Externally tagged enum variant: `{variant: inner}`.
struct VariantData<I> {
    variant: &'static str,
    inner: I,
}

impl<I> VariantData<I> {
    fn wrap(variant: &'static str, inner: Value) -> Data {
        let mut map = Map::new();
        map.insert(variant.to_string(), inner);
        Some(Value::Object(map))
    }
}

impl ser::SerializeTupleVariant for VariantData<SeqData> {
    type Ok = Data;
    type Error = DataError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DataError> {
        self.inner.push(value)
    }

    fn end(self) -> Result<Data, DataError> {
        Ok(Self::wrap(self.variant, self.inner.finish()))
    }
}

impl ser::SerializeStructVariant for VariantData<MapData> {
    type Ok = Data;
    type Error = DataError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), DataError> {
        self.inner.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Data, DataError> {
        Ok(Self::wrap(self.variant, self.inner.finish()))
    }
}

/// Accepts only string-like map keys.
struct KeySerializer;

fn non_string_key() -> DataError {
    unsupported("non-string map key")
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = DataError;

    type SerializeSeq = Impossible<String, DataError>;
    type SerializeTuple = Impossible<String, DataError>;
    type SerializeTupleStruct = Impossible<String, DataError>;
    type SerializeTupleVariant = Impossible<String, DataError>;
    type SerializeMap = Impossible<String, DataError>;
    type SerializeStruct = Impossible<String, DataError>;
    type SerializeStructVariant = Impossible<String, DataError>;

    fn serialize_str(self, v: &str) -> Result<String, DataError> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String, DataError> {
        Ok(v.to_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String, DataError> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, DataError> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_i8(self, _v: i8) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_i16(self, _v: i16) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_i32(self, _v: i32) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_i64(self, _v: i64) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_u8(self, _v: u8) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_u16(self, _v: u16) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_u32(self, _v: u32) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_u64(self, _v: u64) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_f32(self, _v: f32) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_f64(self, _v: f64) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_none(self) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_unit(self) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, DataError> {
        Err(non_string_key())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, DataError> {
        Err(non_string_key())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, DataError> {
        Err(non_string_key())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, DataError> {
        Err(non_string_key())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, DataError> {
        Err(non_string_key())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, DataError> {
        Err(non_string_key())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, DataError> {
        Err(non_string_key())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, DataError> {
        Err(non_string_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use crate::schema::{SchemaError, ValidationIssue};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    enum Event {
        Created,
        Renamed(String),
        Moved { from: u8, to: Option<u8> },
        Resized(u32, Option<u32>),
    }

    #[test]
    fn test_drops_absent_members_and_elements() {
        let value = json!(null);
        assert_eq!(value_to_data(&value).unwrap(), Value::Null);

        let map: BTreeMap<&str, Option<i32>> = [("a", Some(1)), ("b", None)].into_iter().collect();
        assert_eq!(value_to_data(&map).unwrap(), json!({"a": 1}));

        let list = vec![None, Some("x"), None];
        assert_eq!(value_to_data(&list).unwrap(), json!(["x"]));
    }

    #[test]
    fn test_top_level_absent_is_null() {
        assert_eq!(value_to_data(&None::<u8>).unwrap(), Value::Null);
    }

    #[test]
    fn test_enum_variants() {
        assert_eq!(value_to_data(&Event::Created).unwrap(), json!("Created"));
        assert_eq!(
            value_to_data(&Event::Renamed("rex".into())).unwrap(),
            json!({"Renamed": "rex"})
        );
        assert_eq!(
            value_to_data(&Event::Moved { from: 1, to: None }).unwrap(),
            json!({"Moved": {"from": 1}})
        );
        assert_eq!(
            value_to_data(&Event::Resized(3, None)).unwrap(),
            json!({"Resized": [3]})
        );
    }

    #[test]
    fn test_timestamps_render_as_strings() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(value_to_data(&ts).unwrap(), json!("2024-05-01T08:00:00Z"));
    }

    #[test]
    fn test_schema_error_becomes_issue_list() {
        let error = SchemaError::single(
            ValidationIssue::new(vec!["name".into()], "Required").with_context("code", "invalid_type"),
        );
        assert_eq!(
            value_to_data(&error).unwrap(),
            json!([{"path": ["name"], "message": "Required", "code": "invalid_type"}])
        );
    }

    #[test]
    fn test_unsupported_kinds() {
        assert_eq!(
            value_to_data(&f64::INFINITY).unwrap_err(),
            DataError::UnsupportedType("non-finite float".into())
        );

        let keyed: BTreeMap<u8, &str> = [(1, "one")].into_iter().collect();
        assert_eq!(
            value_to_data(&keyed).unwrap_err(),
            DataError::UnsupportedType("non-string map key".into())
        );

        struct Raw;
        impl Serialize for Raw {
            fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_bytes(&[0xde, 0xad])
            }
        }
        assert_eq!(
            value_to_data(&Raw).unwrap_err().to_string(),
            "unsupported value type: bytes"
        );
        assert!(value_to_data(&i128::MAX).is_err());
        assert_eq!(value_to_data(&42_i128).unwrap(), json!(42));
    }

    fn wire_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            (-1.0e9..1.0e9f64).prop_map(|n| json!(n)),
            "[a-z0-9 ]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,5}", inner), 0..6)
                    .prop_map(|entries| Value::Object(entries.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(value in wire_value()) {
            let once = value_to_data(&value).unwrap();
            let twice = value_to_data(&once).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once, value);
        }

        #[test]
        fn prop_absent_elements_never_survive(items in prop::collection::vec(prop::option::of(any::<i32>()), 0..20)) {
            let data = value_to_data(&items).unwrap();
            let expected: Vec<i32> = items.iter().flatten().copied().collect();
            prop_assert_eq!(data, json!(expected));
        }
    }
}
