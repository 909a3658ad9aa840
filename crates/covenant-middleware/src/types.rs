//! Common types used throughout the middleware pipeline.
//!
//! Requests carry a streaming body that is read at most once (by the
//! contract handler); responses are fully buffered.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use std::convert::Infallible;
use thiserror::Error;

/// Boxed error produced by a request body stream.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The request body type: a boxed, single-read stream of bytes.
pub type Body = BoxBody<Bytes, BoxError>;

/// The HTTP request type used in the middleware pipeline.
pub type Request = http::Request<Body>;

/// The HTTP response type used in the middleware pipeline.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// The request body stream failed before it was fully read.
#[derive(Error, Debug)]
#[error("failed to read request body: {source}")]
pub struct BodyReadError {
    #[source]
    source: BoxError,
}

impl BodyReadError {
    /// Wraps a stream failure.
    #[must_use]
    pub fn new(source: BoxError) -> Self {
        Self { source }
    }
}

/// Creates a request body from in-memory bytes.
pub fn full_body(bytes: impl Into<Bytes>) -> Body {
    Full::new(bytes.into())
        .map_err(|never: Infallible| match never {})
        .boxed()
}

/// Creates an empty request body.
pub fn empty_body() -> Body {
    full_body(Bytes::new())
}

/// Reads a request body to completion.
pub async fn read_body(body: Body) -> Result<Bytes, BodyReadError> {
    body.collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(BodyReadError::new)
}

/// Extension trait for building pipeline responses.
pub trait ResponseExt {
    /// Creates a response with a status and no body.
    fn empty(status: StatusCode) -> Response;

    /// Creates a response with a status, a body and its `content-type`.
    fn with_body(
        status: StatusCode,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Result<Response, http::header::InvalidHeaderValue>;
}

impl ResponseExt for Response {
    fn empty(status: StatusCode) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    }

    fn with_body(
        status: StatusCode,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Result<Response, http::header::InvalidHeaderValue> {
        let content_type = HeaderValue::from_str(content_type)?;
        let mut response = http::Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        response.headers_mut().insert(CONTENT_TYPE, content_type);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_response() {
        let response = Response::empty(StatusCode::NO_CONTENT);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_response_with_body() {
        let response =
            Response::with_body(StatusCode::OK, "application/json", r#"{"ok":true}"#).unwrap();
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert!(Response::with_body(StatusCode::OK, "bad\nvalue", "").is_err());
    }

    #[test]
    fn test_read_body() {
        let bytes = tokio_test::block_on(read_body(full_body("hello"))).unwrap();
        assert_eq!(&bytes[..], b"hello");
    }
}
