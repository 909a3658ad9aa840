//! Body codecs.
//!
//! A [`Decoder`] turns request text into an unvalidated [`Value`]; an
//! [`Encoder`] turns a wire value into response text. Both are selected by
//! the negotiated media type, and both reject media types they do not
//! handle.

use mime::Mime;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::query::{expand_pairs, flatten_query};

/// Failure to decode a request body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No decoder handles the media type.
    #[error("unsupported media type for decoding: {0}")]
    UnsupportedMediaType(String),

    /// The body is not valid UTF-8.
    #[error("body is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// The body is malformed for its media type.
    #[error("malformed {media_type} body: {message}")]
    Malformed {
        /// The media type the body was decoded as.
        media_type: String,
        /// The underlying parser message.
        message: String,
    },
}

/// Failure to encode a response body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// No encoder handles the media type.
    #[error("unsupported media type for encoding: {0}")]
    UnsupportedMediaType(String),

    /// The value has no representation in the media type.
    #[error("cannot encode value as {media_type}: {message}")]
    Unrepresentable {
        /// The target media type.
        media_type: String,
        /// Why the value cannot be represented.
        message: String,
    },
}

/// Decodes request text for a media type.
pub trait Decoder: Send + Sync {
    /// Returns `true` if this decoder handles `media_type`.
    fn supports(&self, media_type: &str) -> bool;

    /// Decodes `text` as `media_type`.
    fn decode(&self, text: &str, media_type: &str) -> Result<Value, DecodeError>;
}

/// Encodes wire values for a media type.
pub trait Encoder: Send + Sync {
    /// Returns `true` if this encoder handles `media_type`.
    fn supports(&self, media_type: &str) -> bool;

    /// Encodes `value` as `media_type`.
    fn encode(&self, value: &Value, media_type: &str) -> Result<String, EncodeError>;
}

impl<T: Decoder + ?Sized> Decoder for Arc<T> {
    fn supports(&self, media_type: &str) -> bool {
        (**self).supports(media_type)
    }

    fn decode(&self, text: &str, media_type: &str) -> Result<Value, DecodeError> {
        (**self).decode(text, media_type)
    }
}

impl<T: Encoder + ?Sized> Encoder for Arc<T> {
    fn supports(&self, media_type: &str) -> bool {
        (**self).supports(media_type)
    }

    fn encode(&self, value: &Value, media_type: &str) -> Result<String, EncodeError> {
        (**self).encode(value, media_type)
    }
}

/// Parses a media type, ignoring parameters.
fn essence(media_type: &str) -> Option<Mime> {
    media_type.trim().parse::<Mime>().ok()
}

/// JSON codec for `application/json` and `+json` structured syntax suffixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    fn handles(media_type: &str) -> bool {
        essence(media_type).is_some_and(|mime| {
            mime.type_() == mime::APPLICATION
                && (mime.subtype() == mime::JSON || mime.suffix().is_some_and(|suffix| suffix == mime::JSON))
        })
    }
}

impl Decoder for JsonCodec {
    fn supports(&self, media_type: &str) -> bool {
        Self::handles(media_type)
    }

    fn decode(&self, text: &str, media_type: &str) -> Result<Value, DecodeError> {
        if !Self::handles(media_type) {
            return Err(DecodeError::UnsupportedMediaType(media_type.to_string()));
        }
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed {
            media_type: media_type.to_string(),
            message: e.to_string(),
        })
    }
}

impl Encoder for JsonCodec {
    fn supports(&self, media_type: &str) -> bool {
        Self::handles(media_type)
    }

    fn encode(&self, value: &Value, media_type: &str) -> Result<String, EncodeError> {
        if !Self::handles(media_type) {
            return Err(EncodeError::UnsupportedMediaType(media_type.to_string()));
        }
        serde_json::to_string(value).map_err(|e| EncodeError::Unrepresentable {
            media_type: media_type.to_string(),
            message: e.to_string(),
        })
    }
}

/// Codec for `application/x-www-form-urlencoded`, with bracket notation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlEncodedCodec;

impl UrlEncodedCodec {
    fn handles(media_type: &str) -> bool {
        essence(media_type).is_some_and(|mime| {
            mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()
        })
    }
}

impl Decoder for UrlEncodedCodec {
    fn supports(&self, media_type: &str) -> bool {
        Self::handles(media_type)
    }

    fn decode(&self, text: &str, media_type: &str) -> Result<Value, DecodeError> {
        if !Self::handles(media_type) {
            return Err(DecodeError::UnsupportedMediaType(media_type.to_string()));
        }
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(text).map_err(|e| DecodeError::Malformed {
                media_type: media_type.to_string(),
                message: e.to_string(),
            })?;
        Ok(expand_pairs(pairs))
    }
}

impl Encoder for UrlEncodedCodec {
    fn supports(&self, media_type: &str) -> bool {
        Self::handles(media_type)
    }

    fn encode(&self, value: &Value, media_type: &str) -> Result<String, EncodeError> {
        if !Self::handles(media_type) {
            return Err(EncodeError::UnsupportedMediaType(media_type.to_string()));
        }
        let Value::Object(members) = value else {
            return Err(EncodeError::Unrepresentable {
                media_type: media_type.to_string(),
                message: "only objects can be form encoded".to_string(),
            });
        };
        serde_urlencoded::to_string(flatten_query(members)).map_err(|e| {
            EncodeError::Unrepresentable {
                media_type: media_type.to_string(),
                message: e.to_string(),
            }
        })
    }
}

/// Dispatches to the first registered codec supporting the media type.
///
/// ```
/// use covenant_core::{Codecs, Decoder, Encoder};
/// use serde_json::json;
///
/// let codecs = Codecs::default();
/// let value = codecs.decode("name=rex", "application/x-www-form-urlencoded").unwrap();
/// assert_eq!(codecs.encode(&value, "application/json").unwrap(), r#"{"name":"rex"}"#);
/// ```
#[derive(Clone)]
pub struct Codecs {
    decoders: Vec<Arc<dyn Decoder>>,
    encoders: Vec<Arc<dyn Encoder>>,
}

impl Codecs {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            decoders: Vec::new(),
            encoders: Vec::new(),
        }
    }

    /// Registers a decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoders.push(Arc::new(decoder));
        self
    }

    /// Registers an encoder.
    #[must_use]
    pub fn with_encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoders.push(Arc::new(encoder));
        self
    }
}

impl Default for Codecs {
    fn default() -> Self {
        Self::empty()
            .with_decoder(JsonCodec)
            .with_decoder(UrlEncodedCodec)
            .with_encoder(JsonCodec)
            .with_encoder(UrlEncodedCodec)
    }
}

impl std::fmt::Debug for Codecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codecs")
            .field("decoders", &self.decoders.len())
            .field("encoders", &self.encoders.len())
            .finish()
    }
}

impl Decoder for Codecs {
    fn supports(&self, media_type: &str) -> bool {
        self.decoders.iter().any(|d| d.supports(media_type))
    }

    fn decode(&self, text: &str, media_type: &str) -> Result<Value, DecodeError> {
        self.decoders
            .iter()
            .find(|d| d.supports(media_type))
            .ok_or_else(|| DecodeError::UnsupportedMediaType(media_type.to_string()))?
            .decode(text, media_type)
    }
}

impl Encoder for Codecs {
    fn supports(&self, media_type: &str) -> bool {
        self.encoders.iter().any(|e| e.supports(media_type))
    }

    fn encode(&self, value: &Value, media_type: &str) -> Result<String, EncodeError> {
        self.encoders
            .iter()
            .find(|e| e.supports(media_type))
            .ok_or_else(|| EncodeError::UnsupportedMediaType(media_type.to_string()))?
            .encode(value, media_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_media_types() {
        assert!(Decoder::supports(&JsonCodec, "application/json"));
        assert!(Decoder::supports(&JsonCodec, "application/json; charset=utf-8"));
        assert!(Decoder::supports(&JsonCodec, "application/problem+json"));
        assert!(!Decoder::supports(&JsonCodec, "text/plain"));
        assert!(!Decoder::supports(&JsonCodec, "not a media type"));
    }

    #[test]
    fn test_json_decode() {
        let value = JsonCodec.decode(r#"{"name":"rex"}"#, "application/json").unwrap();
        assert_eq!(value, json!({"name": "rex"}));

        let error = JsonCodec.decode("{", "application/json").unwrap_err();
        assert!(matches!(error, DecodeError::Malformed { .. }));

        let error = JsonCodec.decode("{}", "text/xml").unwrap_err();
        assert_eq!(error, DecodeError::UnsupportedMediaType("text/xml".into()));
    }

    #[test]
    fn test_json_encode_preserves_order() {
        let text = JsonCodec
            .encode(&json!({"z": 1, "a": [true, null]}), "application/json")
            .unwrap();
        assert_eq!(text, r#"{"z":1,"a":[true,null]}"#);
    }

    #[test]
    fn test_urlencoded_round_trip() {
        let value = UrlEncodedCodec
            .decode("name=rex&tags[]=a&tags[]=b", "application/x-www-form-urlencoded")
            .unwrap();
        assert_eq!(value, json!({"name": "rex", "tags": ["a", "b"]}));

        let text = UrlEncodedCodec
            .encode(&value, "application/x-www-form-urlencoded")
            .unwrap();
        assert_eq!(text, "name=rex&tags%5B0%5D=a&tags%5B1%5D=b");
    }

    #[test]
    fn test_urlencoded_deeply_nested_key() {
        let text = format!("a{}=1", "[b]".repeat(20_000));
        let value = UrlEncodedCodec
            .decode(&text, "application/x-www-form-urlencoded")
            .unwrap();

        let leaf = &value["a"]["b"]["b"]["b"]["b"]["b"];
        assert!(leaf.is_object());
        assert_eq!(leaf.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_urlencoded_rejects_non_objects() {
        let error = UrlEncodedCodec
            .encode(&json!([1, 2]), "application/x-www-form-urlencoded")
            .unwrap_err();
        assert!(matches!(error, EncodeError::Unrepresentable { .. }));
    }

    #[test]
    fn test_registry_dispatch() {
        let codecs = Codecs::default();
        assert!(Encoder::supports(&codecs, "application/json"));
        assert!(!Encoder::supports(&codecs, "text/csv"));
        assert_eq!(
            codecs.encode(&json!({}), "text/csv").unwrap_err(),
            EncodeError::UnsupportedMediaType("text/csv".into())
        );
        assert!(!Decoder::supports(&Codecs::empty(), "application/json"));
    }
}
