//! HTTP error type for Covenant.
//!
//! This module provides [`HttpError`], the structured error every failure is
//! normalized into before it reaches a client. The wire shape follows the
//! problem-details layout:
//!
//! ```json
//! {
//!   "type": "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.1",
//!   "title": "Bad Request",
//!   "status": 400,
//!   "detail": "Invalid query",
//!   "invalidParameters": [{ "name": "page", "reason": "Expected integer, received string", "context": {} }],
//!   "context": "query"
//! }
//! ```
//!
//! # Status classification
//!
//! | `status` | Class  | Logged at | Detail returned to client |
//! |----------|--------|-----------|---------------------------|
//! | `< 500`  | client | info      | always                    |
//! | `>= 500` | server | error     | only in debug mode        |

use http::StatusCode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::invalid_parameter::InvalidParameter;

/// Result type alias using [`HttpError`].
pub type HttpResult<T> = Result<T, HttpError>;

/// `type` used when a status has no registered reference.
pub const ABOUT_BLANK: &str = "about:blank";

/// Structured HTTP error.
///
/// `HttpError` is both a serializable response body and a regular error type,
/// so handlers and middleware can return it through `anyhow` and have the
/// error normalization stage recognise it by downcasting.
///
/// # Example
///
/// ```
/// use covenant_core::HttpError;
/// use http::StatusCode;
///
/// let error = HttpError::not_found().with_detail("There is no pet with id 42");
/// assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
/// assert!(error.is_client_error());
/// assert_eq!(error.title, "Not Found");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{status} {title}")]
pub struct HttpError {
    /// URI reference identifying the problem type.
    #[serde(rename = "type")]
    pub type_uri: String,

    /// Short, human-readable summary of the problem type.
    pub title: String,

    /// HTTP status code.
    pub status: u16,

    /// Human-readable explanation specific to this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Per-field validation failures.
    #[serde(
        rename = "invalidParameters",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub invalid_parameters: Option<Vec<InvalidParameter>>,

    /// Additional members (e.g. `context`, `supportedValues`, `error`).
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl HttpError {
    /// Creates an error for the given status with its registered `type` and title.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            type_uri: type_reference(status).unwrap_or(ABOUT_BLANK).to_string(),
            title: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            status: status.as_u16(),
            detail: None,
            invalid_parameters: None,
            extra: IndexMap::new(),
        }
    }

    /// Creates a `400 Bad Request` error.
    #[must_use]
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    /// Creates a `401 Unauthorized` error.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED)
    }

    /// Creates a `403 Forbidden` error.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN)
    }

    /// Creates a `404 Not Found` error.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// Creates a `405 Method Not Allowed` error.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED)
    }

    /// Creates a `406 Not Acceptable` error.
    #[must_use]
    pub fn not_acceptable() -> Self {
        Self::new(StatusCode::NOT_ACCEPTABLE)
    }

    /// Creates a `409 Conflict` error.
    #[must_use]
    pub fn conflict() -> Self {
        Self::new(StatusCode::CONFLICT)
    }

    /// Creates a `415 Unsupported Media Type` error.
    #[must_use]
    pub fn unsupported_media_type() -> Self {
        Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE)
    }

    /// Creates a `422 Unprocessable Entity` error.
    #[must_use]
    pub fn unprocessable_entity() -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY)
    }

    /// Creates a `500 Internal Server Error` error.
    #[must_use]
    pub fn internal_server_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Creates a `503 Service Unavailable` error.
    #[must_use]
    pub fn service_unavailable() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE)
    }

    /// Sets the occurrence-specific detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the invalid parameters.
    #[must_use]
    pub fn with_invalid_parameters(mut self, invalid_parameters: Vec<InvalidParameter>) -> Self {
        self.invalid_parameters = Some(invalid_parameters);
        self
    }

    /// Adds an extra member.
    ///
    /// The reserved members (`type`, `title`, `status`, `detail`,
    /// `invalidParameters`) are owned by the struct fields and are ignored here.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !is_reserved(&key) {
            self.extra.insert(key, value.into());
        }
        self
    }

    /// Returns an extra member.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Returns the status as a [`StatusCode`].
    ///
    /// Out-of-range values are reported as `500`.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns `true` for client errors.
    ///
    /// Classifies [`status_code`](Self::status_code), so a status outside
    /// `100..=999` counts as a server error just as it is reported as `500`.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().as_u16() < 500
    }

    /// Returns `true` for server errors, including out-of-range statuses.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns a copy reduced to `type`, `status` and `title`.
    ///
    /// This is what clients see for server errors outside debug mode.
    #[must_use]
    pub fn to_minimal(&self) -> Self {
        Self {
            type_uri: self.type_uri.clone(),
            title: self.title.clone(),
            status: self.status,
            detail: None,
            invalid_parameters: None,
            extra: IndexMap::new(),
        }
    }
}

fn is_reserved(key: &str) -> bool {
    matches!(
        key,
        "type" | "title" | "status" | "detail" | "invalidParameters"
    )
}

/// Returns the RFC 2616 section describing a status code.
#[must_use]
pub fn type_reference(status: StatusCode) -> Option<&'static str> {
    let reference = match status.as_u16() {
        400 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.1",
        401 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.2",
        402 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.3",
        403 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.4",
        404 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.5",
        405 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.6",
        406 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.7",
        407 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.8",
        408 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.9",
        409 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.10",
        410 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.11",
        411 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.12",
        412 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.13",
        413 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.14",
        414 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.15",
        415 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.16",
        416 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.17",
        417 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.18",
        418 => "https://datatracker.ietf.org/doc/html/rfc2324#section-2.3.2",
        421 => "https://datatracker.ietf.org/doc/html/rfc7540#section-9.1.2",
        422 => "https://datatracker.ietf.org/doc/html/rfc4918#section-11.2",
        423 => "https://datatracker.ietf.org/doc/html/rfc4918#section-11.3",
        424 => "https://datatracker.ietf.org/doc/html/rfc4918#section-11.4",
        425 => "https://datatracker.ietf.org/doc/html/rfc8470#section-5.2",
        426 => "https://datatracker.ietf.org/doc/html/rfc2817#section-6",
        428 => "https://datatracker.ietf.org/doc/html/rfc6585#section-3",
        429 => "https://datatracker.ietf.org/doc/html/rfc6585#section-4",
        431 => "https://datatracker.ietf.org/doc/html/rfc6585#section-5",
        451 => "https://datatracker.ietf.org/doc/html/rfc7725#section-3",
        500 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.5.1",
        501 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.5.2",
        502 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.5.3",
        503 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.5.4",
        504 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.5.5",
        505 => "https://datatracker.ietf.org/doc/html/rfc2616#section-10.5.6",
        506 => "https://datatracker.ietf.org/doc/html/rfc2295#section-8.1",
        507 => "https://datatracker.ietf.org/doc/html/rfc4918#section-11.5",
        508 => "https://datatracker.ietf.org/doc/html/rfc5842#section-7.2",
        510 => "https://datatracker.ietf.org/doc/html/rfc2774#section-7",
        511 => "https://datatracker.ietf.org/doc/html/rfc6585#section-6",
        _ => return None,
    };
    Some(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bad_request() {
        let error = HttpError::bad_request();
        assert_eq!(error.status, 400);
        assert_eq!(error.title, "Bad Request");
        assert_eq!(
            error.type_uri,
            "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.1"
        );
        assert!(error.is_client_error());
        assert!(!error.is_server_error());
    }

    #[test]
    fn test_internal_server_error() {
        let error = HttpError::internal_server_error();
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.is_server_error());
        assert_eq!(error.to_string(), "500 Internal Server Error");
    }

    #[test]
    fn test_out_of_range_status_is_a_server_error() {
        for raw in [0, 42, 99, 1000] {
            let mut error = HttpError::bad_request();
            error.status = raw;
            assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(error.is_server_error(), "status {raw}");
            assert!(!error.is_client_error(), "status {raw}");
        }
    }

    #[test]
    fn test_unregistered_status_uses_about_blank() {
        let error = HttpError::new(StatusCode::from_u16(499).unwrap());
        assert_eq!(error.type_uri, ABOUT_BLANK);
        assert!(error.is_client_error());
    }

    #[test]
    fn test_serialization_shape() {
        let error = HttpError::unsupported_media_type()
            .with_detail("Missing content-type: \"application/json\"")
            .with_extra("supportedValues", json!(["application/json"]));

        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.16",
                "title": "Unsupported Media Type",
                "status": 415,
                "detail": "Missing content-type: \"application/json\"",
                "supportedValues": ["application/json"]
            })
        );
    }

    #[test]
    fn test_invalid_parameters_serialized_camel_case() {
        let error = HttpError::bad_request().with_invalid_parameters(vec![InvalidParameter {
            name: "name".to_string(),
            reason: "Required".to_string(),
            context: serde_json::Map::new(),
        }]);

        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["invalidParameters"][0]["name"], "name");
    }

    #[test]
    fn test_reserved_extras_are_ignored() {
        let error = HttpError::not_found()
            .with_extra("status", 200)
            .with_extra("title", "Hijacked");
        assert!(error.extra.is_empty());
        assert_eq!(error.status, 404);
    }

    #[test]
    fn test_to_minimal_strips_detail_and_extras() {
        let error = HttpError::internal_server_error()
            .with_detail("database exploded")
            .with_extra("error", json!({"message": "boom"}));

        let minimal = error.to_minimal();
        assert_eq!(
            serde_json::to_value(&minimal).unwrap(),
            json!({
                "type": "https://datatracker.ietf.org/doc/html/rfc2616#section-10.5.1",
                "title": "Internal Server Error",
                "status": 500
            })
        );
    }

    #[test]
    fn test_round_trip_keeps_extras() {
        let error = HttpError::conflict().with_extra("resource", "pet");
        let json = serde_json::to_string(&error).unwrap();
        let parsed: HttpError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, error);
    }

    #[test]
    fn test_all_registered_statuses_are_errors() {
        for code in 400..600 {
            let status = StatusCode::from_u16(code).unwrap();
            if type_reference(status).is_some() {
                assert!(status.is_client_error() || status.is_server_error());
            }
        }
    }
}
