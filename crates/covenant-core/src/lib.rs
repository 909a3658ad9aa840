//! # Covenant Core
//!
//! Core types for the Covenant HTTP contract layer.
//!
//! This crate holds everything the middleware pipeline is built from but
//! which does not itself touch HTTP plumbing:
//!
//! - [`HttpError`]: the structured error every failure is normalized into
//! - [`Schema`]: the validation capability, with [`ShapeSchema`] and
//!   [`TypedSchema`] as bundled implementations
//! - [`extract_invalid_parameters`]: client-facing rendering of issues
//! - [`value_to_data`]: normalization of arbitrary values into wire values
//! - [`Decoder`] / [`Encoder`]: body codecs, with JSON and form codecs
//! - [`Negotiator`]: header negotiation for `Accept`, `Content-Type` and
//!   `Accept-Language`
//! - [`Attributes`]: the append-only request attribute bag

#![doc(html_root_url = "https://docs.rs/covenant-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod attributes;
pub mod codec;
pub mod data;
pub mod error;
pub mod invalid_parameter;
pub mod negotiation;
pub mod query;
pub mod schema;
pub mod shape;
pub mod typed;

pub use attributes::{Attributes, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
pub use codec::{Codecs, DecodeError, Decoder, EncodeError, Encoder, JsonCodec, UrlEncodedCodec};
pub use data::{value_to_data, DataError};
pub use error::{HttpError, HttpResult};
pub use invalid_parameter::{extract_invalid_parameters, InvalidParameter, REDACTED};
pub use negotiation::{
    AcceptLanguageNegotiator, AcceptNegotiator, ContentTypeNegotiator, NegotiatedValue, Negotiator,
};
pub use query::parse_query;
pub use schema::{ContextValue, PathSegment, Schema, SchemaError, ValidationIssue};
pub use shape::ShapeSchema;
pub use typed::TypedSchema;
