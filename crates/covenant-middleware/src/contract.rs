//! Contract validation around a domain handler.
//!
//! A [`ContractHandler`] is the terminal [`RequestHandler`] of a pipeline. It
//! validates each request facet against its declared schema, calls the
//! domain handler with the validated values, then checks and encodes what
//! the handler returned.
//!
//! # Failure policy
//!
//! | Facet              | On failure                                        |
//! |--------------------|---------------------------------------------------|
//! | attributes         | the schema error propagates (misconfiguration)    |
//! | query              | `400` with `invalidParameters`, `context: "query"`   |
//! | headers            | `400` with `invalidParameters`, `context: "headers"` |
//! | body               | `400` with `invalidParameters`, `context: "body"`    |
//! | response headers   | the schema error propagates                       |
//! | response body      | the schema error propagates                       |
//!
//! # Example
//!
//! ```
//! use covenant_core::{JsonCodec, ShapeSchema};
//! use covenant_middleware::contract::{ContractHandler, DomainResponse};
//! use http::StatusCode;
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct NewPet {
//!     name: String,
//! }
//!
//! let handler = ContractHandler::builder(ShapeSchema::any())
//!     .body(ShapeSchema::object().field("name", ShapeSchema::string()).typed::<NewPet>())
//!     .decoder(JsonCodec)
//!     .response_body(ShapeSchema::object().field("id", ShapeSchema::integer()))
//!     .encoder(JsonCodec)
//!     .build(|request| async move {
//!         let pet = request.body.expect("body schema declared");
//!         tracing::info!(name = %pet.name, "creating pet");
//!         Ok(DomainResponse::new(StatusCode::CREATED).with_body(json!({ "id": 1 })))
//!     })
//!     .unwrap();
//! # let _ = handler;
//! ```

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, RequestHandler},
    types::{read_body, Request, Response, ResponseExt},
};
use bytes::Bytes;
use covenant_core::{
    parse_query, value_to_data, Decoder, Encoder, HttpError, Schema, SchemaError, ACCEPT,
    CONTENT_TYPE,
};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri};
use http_body_util::Full;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

type FacetSchema<T> = Box<dyn Schema<Output = T>>;

type ResponseHeadersCheck = Box<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

type ResponseBodyCheck = Box<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

type DomainHandler<A, Q, H, B, T> = Box<
    dyn Fn(ValidatedRequest<A, Q, H, B>) -> BoxFuture<'static, anyhow::Result<DomainResponse<T>>>
        + Send
        + Sync,
>;

/// A contract whose codec declarations do not match its schemas.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractConfigError {
    /// A request body schema was declared without a decoder.
    #[error("a request body schema requires a decoder")]
    MissingDecoder,

    /// A decoder was given without a request body schema.
    #[error("a decoder was provided without a request body schema")]
    UnexpectedDecoder,

    /// A response body schema was declared without an encoder.
    #[error("a response body schema requires an encoder")]
    MissingEncoder,

    /// An encoder was given without a response body schema.
    #[error("an encoder was provided without a response body schema")]
    UnexpectedEncoder,
}

/// The validated facets of a request, as seen by a domain handler.
///
/// A facet without a declared schema is `None`.
#[derive(Debug)]
pub struct ValidatedRequest<A, Q = (), H = (), B = ()> {
    /// Request method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Validated request attributes.
    pub attributes: A,
    /// Validated query.
    pub query: Option<Q>,
    /// Validated headers.
    pub headers: Option<H>,
    /// Validated body.
    pub body: Option<B>,
}

/// What a domain handler returns.
#[derive(Debug, Clone)]
pub struct DomainResponse<T> {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body; `None` emits no body.
    pub body: Option<T>,
}

impl<T> DomainResponse<T> {
    /// Creates a response with a status, no headers and no body.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a `200 OK` response with a body.
    #[must_use]
    pub fn ok(body: T) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: T) -> Self {
        self.body = Some(body);
        self
    }
}

/// Builder for [`ContractHandler`].
///
/// Each facet method changes the corresponding type parameter to the
/// declared schema's output.
pub struct ContractBuilder<A, Q = (), H = (), B = ()> {
    attributes: FacetSchema<A>,
    query: Option<FacetSchema<Q>>,
    headers: Option<FacetSchema<H>>,
    body: Option<FacetSchema<B>>,
    decoder: Option<Arc<dyn Decoder>>,
    response_headers: Option<ResponseHeadersCheck>,
    response_body: Option<ResponseBodyCheck>,
    encoder: Option<Arc<dyn Encoder>>,
}

impl<A, Q, H, B> ContractBuilder<A, Q, H, B> {
    /// Declares the query schema.
    pub fn query<S>(self, schema: S) -> ContractBuilder<A, S::Output, H, B>
    where
        S: Schema + 'static,
    {
        ContractBuilder {
            attributes: self.attributes,
            query: Some(Box::new(schema)),
            headers: self.headers,
            body: self.body,
            decoder: self.decoder,
            response_headers: self.response_headers,
            response_body: self.response_body,
            encoder: self.encoder,
        }
    }

    /// Declares the request headers schema.
    ///
    /// Headers are validated as an object keyed by lowercase name; a
    /// repeated header is a list of strings.
    pub fn headers<S>(self, schema: S) -> ContractBuilder<A, Q, S::Output, B>
    where
        S: Schema + 'static,
    {
        ContractBuilder {
            attributes: self.attributes,
            query: self.query,
            headers: Some(Box::new(schema)),
            body: self.body,
            decoder: self.decoder,
            response_headers: self.response_headers,
            response_body: self.response_body,
            encoder: self.encoder,
        }
    }

    /// Declares the request body schema. Requires a [`decoder`](Self::decoder).
    pub fn body<S>(self, schema: S) -> ContractBuilder<A, Q, H, S::Output>
    where
        S: Schema + 'static,
    {
        ContractBuilder {
            attributes: self.attributes,
            query: self.query,
            headers: self.headers,
            body: Some(Box::new(schema)),
            decoder: self.decoder,
            response_headers: self.response_headers,
            response_body: self.response_body,
            encoder: self.encoder,
        }
    }

    /// Sets the request body decoder.
    #[must_use]
    pub fn decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    /// Declares the response headers schema.
    #[must_use]
    pub fn response_headers<S>(mut self, schema: S) -> Self
    where
        S: Schema + 'static,
    {
        self.response_headers = Some(Box::new(move |headers: &Value| -> anyhow::Result<()> {
            schema.parse(headers).map(|_| ())
        }));
        self
    }

    /// Declares the response body schema. Requires an [`encoder`](Self::encoder).
    #[must_use]
    pub fn response_body<S>(mut self, schema: S) -> Self
    where
        S: Schema + 'static,
        S::Output: Serialize,
    {
        self.response_body = Some(Box::new(move |body: &Value| -> anyhow::Result<Value> {
            let output = schema.parse(body)?;
            Ok(value_to_data(&output)?)
        }));
        self
    }

    /// Sets the response body encoder.
    #[must_use]
    pub fn encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Checks the codec declarations and attaches the domain handler.
    pub fn build<T, F, Fut>(
        self,
        handler: F,
    ) -> Result<ContractHandler<A, Q, H, B, T>, ContractConfigError>
    where
        F: Fn(ValidatedRequest<A, Q, H, B>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<DomainResponse<T>>> + Send + 'static,
    {
        match (self.body.is_some(), self.decoder.is_some()) {
            (true, false) => return Err(ContractConfigError::MissingDecoder),
            (false, true) => return Err(ContractConfigError::UnexpectedDecoder),
            _ => {}
        }
        match (self.response_body.is_some(), self.encoder.is_some()) {
            (true, false) => return Err(ContractConfigError::MissingEncoder),
            (false, true) => return Err(ContractConfigError::UnexpectedEncoder),
            _ => {}
        }

        Ok(ContractHandler {
            attributes: self.attributes,
            query: self.query,
            headers: self.headers,
            body: self.body,
            decoder: self.decoder,
            response_headers: self.response_headers,
            response_body: self.response_body,
            encoder: self.encoder,
            handler: Box::new(
                move |request: ValidatedRequest<A, Q, H, B>| -> BoxFuture<'static, anyhow::Result<DomainResponse<T>>> {
                    Box::pin(handler(request))
                },
            ),
        })
    }
}

/// Validates requests and responses around a domain handler.
pub struct ContractHandler<A, Q = (), H = (), B = (), T = Value> {
    attributes: FacetSchema<A>,
    query: Option<FacetSchema<Q>>,
    headers: Option<FacetSchema<H>>,
    body: Option<FacetSchema<B>>,
    decoder: Option<Arc<dyn Decoder>>,
    response_headers: Option<ResponseHeadersCheck>,
    response_body: Option<ResponseBodyCheck>,
    encoder: Option<Arc<dyn Encoder>>,
    handler: DomainHandler<A, Q, H, B, T>,
}

impl ContractHandler<()> {
    /// Starts a contract from its attributes schema.
    ///
    /// Attributes are parsed strictly: a failure means the pipeline did not
    /// install what the handler depends on.
    pub fn builder<S>(attributes: S) -> ContractBuilder<S::Output>
    where
        S: Schema + 'static,
    {
        ContractBuilder {
            attributes: Box::new(attributes),
            query: None,
            headers: None,
            body: None,
            decoder: None,
            response_headers: None,
            response_body: None,
            encoder: None,
        }
    }
}

impl<A, Q, H, B, T> ContractHandler<A, Q, H, B, T>
where
    A: Send + 'static,
    Q: Send + 'static,
    H: Send + 'static,
    B: Send + 'static,
    T: Serialize + Send + 'static,
{
    async fn run(&self, ctx: &MiddlewareContext, request: Request) -> anyhow::Result<Response> {
        let attributes = ctx.attributes();
        let validated_attributes = self.attributes.parse(&attributes.to_value())?;

        let (parts, body) = request.into_parts();

        let query = match &self.query {
            Some(schema) => {
                let raw = parse_query(parts.uri.query().unwrap_or_default()).map_err(|error| {
                    HttpError::bad_request()
                        .with_detail(error.to_string())
                        .with_extra("context", "query")
                })?;
                Some(validate_facet(&**schema, &raw, "query")?)
            }
            None => None,
        };

        let headers = match &self.headers {
            Some(schema) => Some(validate_facet(
                &**schema,
                &headers_to_value(&parts.headers),
                "headers",
            )?),
            None => None,
        };

        let body = match (&self.body, &self.decoder, attributes.get_str(CONTENT_TYPE)) {
            (Some(schema), Some(decoder), Some(content_type)) => {
                let bytes = read_body(body).await?;
                let text = std::str::from_utf8(&bytes).map_err(|error| {
                    body_error().with_detail(format!("body is not valid UTF-8: {error}"))
                })?;
                let decoded = decoder
                    .decode(text, content_type)
                    .map_err(|error| body_error().with_detail(error.to_string()))?;
                Some(validate_facet(&**schema, &decoded, "body")?)
            }
            _ => None,
        };

        let response = (self.handler)(ValidatedRequest {
            method: parts.method,
            uri: parts.uri,
            attributes: validated_attributes,
            query,
            headers,
            body,
        })
        .await?;

        self.respond(attributes.get_str(ACCEPT), response)
    }

    fn respond(&self, accept: Option<&str>, response: DomainResponse<T>) -> anyhow::Result<Response> {
        let DomainResponse {
            status,
            headers,
            body,
        } = response;

        if let Some(check) = &self.response_headers {
            check(&headers_to_value(&headers))?;
        }

        let mut output = Response::empty(status);
        *output.headers_mut() = headers;

        if let (Some(check), Some(encoder), Some(accept), Some(body)) =
            (&self.response_body, &self.encoder, accept, body)
        {
            let data = check(&value_to_data(&body)?)?;
            let text = encoder.encode(&data, accept)?;
            *output.body_mut() = Full::new(Bytes::from(text));
            output
                .headers_mut()
                .insert(http::header::CONTENT_TYPE, HeaderValue::from_str(accept)?);
        }

        Ok(output)
    }
}

impl<A, Q, H, B, T> RequestHandler for ContractHandler<A, Q, H, B, T>
where
    A: Send + 'static,
    Q: Send + 'static,
    H: Send + 'static,
    B: Send + 'static,
    T: Serialize + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        ctx: &'a MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, anyhow::Result<Response>> {
        Box::pin(self.run(ctx, request))
    }
}

impl<A, Q, H, B, T> std::fmt::Debug for ContractHandler<A, Q, H, B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractHandler")
            .field("query", &self.query.is_some())
            .field("headers", &self.headers.is_some())
            .field("body", &self.body.is_some())
            .field("response_headers", &self.response_headers.is_some())
            .field("response_body", &self.response_body.is_some())
            .finish_non_exhaustive()
    }
}

fn body_error() -> HttpError {
    HttpError::bad_request().with_extra("context", "body")
}

fn validate_facet<S>(schema: &S, input: &Value, facet: &'static str) -> Result<S::Output, HttpError>
where
    S: Schema + ?Sized,
{
    schema
        .safe_parse(input)
        .map_err(|error: SchemaError| {
            HttpError::bad_request()
                .with_invalid_parameters(error.invalid_parameters())
                .with_extra("context", facet)
        })
}

/// Presents headers as an object keyed by name.
fn headers_to_value(headers: &HeaderMap) -> Value {
    let mut object = Map::new();
    for name in headers.keys() {
        let mut values: Vec<Value> = headers
            .get_all(name)
            .iter()
            .map(|value| Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        };
        object.insert(name.as_str().to_string(), value);
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::full_body;
    use covenant_core::{JsonCodec, ShapeSchema};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Page {
        page: i64,
    }

    fn ctx() -> MiddlewareContext {
        let mut ctx = MiddlewareContext::new();
        ctx.add_attribute(CONTENT_TYPE, "application/json");
        ctx.add_attribute(ACCEPT, "application/json");
        ctx
    }

    fn request(uri: &str, body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .uri(uri)
            .header("x-tenant", "acme")
            .body(full_body(body))
            .unwrap()
    }

    fn pet_body() -> ShapeSchema {
        ShapeSchema::object().field("name", ShapeSchema::string())
    }

    async fn body_of(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn test_codec_declarations_are_checked() {
        let noop = |_request: ValidatedRequest<Value, (), (), Value>| async {
            Ok(DomainResponse::<Value>::new(StatusCode::OK))
        };

        let error = ContractHandler::builder(ShapeSchema::any())
            .body(ShapeSchema::any())
            .build(noop)
            .unwrap_err();
        assert_eq!(error, ContractConfigError::MissingDecoder);

        let error = ContractHandler::builder(ShapeSchema::any())
            .decoder(JsonCodec)
            .build(|_request| async { Ok(DomainResponse::<Value>::new(StatusCode::OK)) })
            .unwrap_err();
        assert_eq!(error, ContractConfigError::UnexpectedDecoder);

        let error = ContractHandler::builder(ShapeSchema::any())
            .response_body(ShapeSchema::any())
            .build(|_request| async { Ok(DomainResponse::<Value>::new(StatusCode::OK)) })
            .unwrap_err();
        assert_eq!(error, ContractConfigError::MissingEncoder);

        let error = ContractHandler::builder(ShapeSchema::any())
            .encoder(JsonCodec)
            .build(|_request| async { Ok(DomainResponse::<Value>::new(StatusCode::OK)) })
            .unwrap_err();
        assert_eq!(error, ContractConfigError::UnexpectedEncoder);
    }

    #[tokio::test]
    async fn test_handler_receives_validated_facets() {
        let handler = ContractHandler::builder(ShapeSchema::any())
            .query(
                ShapeSchema::object()
                    .field("page", ShapeSchema::integer().coerce())
                    .typed::<Page>(),
            )
            .headers(ShapeSchema::object().field("x-tenant", ShapeSchema::string()))
            .body(pet_body())
            .decoder(JsonCodec)
            .response_body(pet_body())
            .encoder(JsonCodec)
            .build(|request| async move {
                assert_eq!(request.query.as_ref().map(|q| q.page), Some(2));
                assert_eq!(request.headers, Some(json!({ "x-tenant": "acme" })));
                assert_eq!(request.uri.path(), "/pets");
                Ok(DomainResponse::new(StatusCode::CREATED).with_body(request.body.unwrap_or_default()))
            })
            .unwrap();

        let response = handler
            .handle(&ctx(), request("/pets?page=2", r#"{"name":"Rex","age":3}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(&body_of(response).await[..], br#"{"name":"Rex"}"#);
    }

    #[tokio::test]
    async fn test_invalid_query_is_bad_request() {
        let handler = ContractHandler::builder(ShapeSchema::any())
            .query(ShapeSchema::object().field("page", ShapeSchema::integer().coerce()))
            .build(|_request| async { Ok(DomainResponse::<Value>::new(StatusCode::OK)) })
            .unwrap();

        let error = handler
            .handle(&ctx(), request("/pets?page=two", ""))
            .await
            .unwrap_err()
            .downcast::<HttpError>()
            .unwrap();

        assert_eq!(error.status, 400);
        assert_eq!(error.extra("context"), Some(&json!("query")));
        let parameters = error.invalid_parameters.unwrap();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].name, "page");
    }

    #[tokio::test]
    async fn test_invalid_headers_are_bad_request() {
        let handler = ContractHandler::builder(ShapeSchema::any())
            .headers(ShapeSchema::object().field("authorization", ShapeSchema::string()))
            .build(|_request| async { Ok(DomainResponse::<Value>::new(StatusCode::OK)) })
            .unwrap();

        let error = handler
            .handle(&ctx(), request("/pets", ""))
            .await
            .unwrap_err()
            .downcast::<HttpError>()
            .unwrap();

        assert_eq!(error.extra("context"), Some(&json!("headers")));
        assert_eq!(error.invalid_parameters.unwrap()[0].name, "authorization");
    }

    #[tokio::test]
    async fn test_body_missing_required_field() {
        let handler = ContractHandler::builder(ShapeSchema::any())
            .body(pet_body())
            .decoder(JsonCodec)
            .build(|_request| async { Ok(DomainResponse::<Value>::new(StatusCode::OK)) })
            .unwrap();

        let error = handler
            .handle(&ctx(), request("/pets", "{}"))
            .await
            .unwrap_err()
            .downcast::<HttpError>()
            .unwrap();

        assert_eq!(error.status, 400);
        assert_eq!(error.extra("context"), Some(&json!("body")));
        let parameters = error.invalid_parameters.unwrap();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].name, "name");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let handler = ContractHandler::builder(ShapeSchema::any())
            .body(pet_body())
            .decoder(JsonCodec)
            .build(|_request| async { Ok(DomainResponse::<Value>::new(StatusCode::OK)) })
            .unwrap();

        let error = handler
            .handle(&ctx(), request("/pets", "{not json"))
            .await
            .unwrap_err()
            .downcast::<HttpError>()
            .unwrap();

        assert_eq!(error.status, 400);
        assert_eq!(error.extra("context"), Some(&json!("body")));
        assert!(error.detail.is_some());
        assert!(error.invalid_parameters.is_none());
    }

    #[tokio::test]
    async fn test_body_skipped_without_content_type() {
        let handler = ContractHandler::builder(ShapeSchema::any())
            .body(pet_body())
            .decoder(JsonCodec)
            .build(|request| async move {
                assert!(request.body.is_none());
                Ok(DomainResponse::<Value>::new(StatusCode::NO_CONTENT))
            })
            .unwrap();

        let response = handler
            .handle(&MiddlewareContext::new(), request("/pets", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_attribute_failure_propagates_schema_error() {
        let handler = ContractHandler::builder(
            ShapeSchema::object().field("userId", ShapeSchema::string()),
        )
        .build(|_request| async { Ok(DomainResponse::<Value>::new(StatusCode::OK)) })
        .unwrap();

        let error = handler.handle(&ctx(), request("/pets", "")).await.unwrap_err();
        assert!(error.is::<SchemaError>());
    }

    #[tokio::test]
    async fn test_response_body_violation_propagates() {
        let handler = ContractHandler::builder(ShapeSchema::any())
            .response_body(pet_body())
            .encoder(JsonCodec)
            .build(|_request| async { Ok(DomainResponse::ok(json!({ "name": 7 }))) })
            .unwrap();

        let error = handler.handle(&ctx(), request("/pets", "")).await.unwrap_err();
        assert!(error.is::<SchemaError>());
    }

    #[tokio::test]
    async fn test_response_headers_are_checked() {
        let handler = ContractHandler::builder(ShapeSchema::any())
            .response_headers(ShapeSchema::object().field("location", ShapeSchema::string()))
            .build(|_request| async { Ok(DomainResponse::<Value>::new(StatusCode::CREATED)) })
            .unwrap();

        let error = handler.handle(&ctx(), request("/pets", "")).await.unwrap_err();
        assert!(error.is::<SchemaError>());
    }

    #[tokio::test]
    async fn test_no_body_without_accept_or_value() {
        let handler = ContractHandler::builder(ShapeSchema::any())
            .response_body(pet_body())
            .encoder(JsonCodec)
            .build(|_request| async { Ok(DomainResponse::<Value>::new(StatusCode::NO_CONTENT)) })
            .unwrap();

        let response = handler.handle(&ctx(), request("/pets", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(http::header::CONTENT_TYPE).is_none());
        assert!(body_of(response).await.is_empty());

        let handler = ContractHandler::builder(ShapeSchema::any())
            .response_body(pet_body())
            .encoder(JsonCodec)
            .build(|_request| async { Ok(DomainResponse::ok(json!({ "name": "Rex" }))) })
            .unwrap();
        let response = handler
            .handle(&MiddlewareContext::new(), request("/pets", ""))
            .await
            .unwrap();
        assert!(response.headers().get(http::header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_repeated_headers_become_lists() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        headers.insert("x-single", HeaderValue::from_static("c"));

        assert_eq!(
            headers_to_value(&headers),
            json!({ "x-tag": ["a", "b"], "x-single": "c" })
        );
    }
}
