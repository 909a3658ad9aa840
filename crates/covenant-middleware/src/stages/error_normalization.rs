//! Error normalization middleware.
//!
//! This middleware turns every failure raised further down the pipeline into
//! an [`HttpError`] response. It never fails itself.
//!
//! # Pipeline Position
//!
//! Error normalization is the outermost stage, so it observes every
//! attribute an inner stage installed before failing:
//!
//! ```text
//! [ErrorNormalization] → Accept → AcceptLanguage → ContentType → Handler
//! ```
//!
//! # Classification
//!
//! - An [`HttpError`] is used as-is.
//! - Anything else goes through the [`ErrorMapper`]. When the mapper gives
//!   up, the failure becomes `500 Internal Server Error` with the original
//!   failure captured under `error`.
//!
//! Client errors (`status < 500`) are logged at info level and returned in
//! full. Server errors are logged at error level and, outside debug mode,
//! returned as `{type, status, title}` only.
//!
//! # Example
//!
//! ```
//! use covenant_core::{ACCEPT, CONTENT_TYPE, JsonCodec};
//! use covenant_middleware::stages::ErrorNormalizationMiddleware;
//!
//! let stage = ErrorNormalizationMiddleware::new(JsonCodec)
//!     .debug(cfg!(debug_assertions))
//!     .log_attributes([ACCEPT, CONTENT_TYPE]);
//! ```

use crate::{
    context::MiddlewareContext,
    logger::{ErrorLogger, LogContext, TracingErrorLogger},
    middleware::{BoxFuture, Middleware, Next},
    types::{BodyReadError, Request, Response, ResponseExt},
};
use covenant_core::{
    value_to_data, Attributes, DataError, DecodeError, EncodeError, Encoder, HttpError, SchemaError,
    ACCEPT,
};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::sync::Arc;

/// Log message used for every normalized error.
const LOG_MESSAGE: &str = "Http error";

/// Converts failures that are not already an [`HttpError`].
///
/// Returning `Err` gives up on the failure, which is then reported as a
/// `500 Internal Server Error`. Closures of the right shape are mappers:
///
/// ```
/// use covenant_core::HttpError;
/// use covenant_middleware::stages::ErrorMapper;
///
/// let mapper = |error: anyhow::Error| match error.downcast::<std::io::Error>() {
///     Ok(_) => Ok(HttpError::service_unavailable()),
///     Err(error) => Err(error),
/// };
/// assert!(mapper.map(anyhow::anyhow!("boom")).is_err());
/// ```
pub trait ErrorMapper: Send + Sync {
    /// Maps a failure to an HTTP error, or hands it back.
    fn map(&self, error: anyhow::Error) -> Result<HttpError, anyhow::Error>;
}

impl<F> ErrorMapper for F
where
    F: Fn(anyhow::Error) -> Result<HttpError, anyhow::Error> + Send + Sync,
{
    fn map(&self, error: anyhow::Error) -> Result<HttpError, anyhow::Error> {
        self(error)
    }
}

/// Mapper that recognises nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughErrorMapper;

impl ErrorMapper for PassThroughErrorMapper {
    fn map(&self, error: anyhow::Error) -> Result<HttpError, anyhow::Error> {
        Err(error)
    }
}

/// Error normalization middleware.
#[derive(Clone)]
pub struct ErrorNormalizationMiddleware {
    encoder: Arc<dyn Encoder>,
    logger: Arc<dyn ErrorLogger>,
    mapper: Arc<dyn ErrorMapper>,
    /// Whether server errors are returned with their details.
    debug: bool,
    /// Attribute names copied into the log context.
    log_attributes: Vec<String>,
}

impl ErrorNormalizationMiddleware {
    /// Creates the stage with the encoder used for error bodies.
    ///
    /// Errors are logged through [`TracingErrorLogger`], unclassified
    /// failures pass through [`PassThroughErrorMapper`], and debug mode is
    /// off.
    pub fn new(encoder: impl Encoder + 'static) -> Self {
        Self {
            encoder: Arc::new(encoder),
            logger: Arc::new(TracingErrorLogger),
            mapper: Arc::new(PassThroughErrorMapper),
            debug: false,
            log_attributes: Vec::new(),
        }
    }

    /// Replaces the error logger.
    #[must_use]
    pub fn with_logger(mut self, logger: impl ErrorLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Replaces the error mapper.
    #[must_use]
    pub fn with_mapper(mut self, mapper: impl ErrorMapper + 'static) -> Self {
        self.mapper = Arc::new(mapper);
        self
    }

    /// Sets whether server error details are returned to clients.
    ///
    /// **Warning**: Only enable this in development environments.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the attribute names included in error logs.
    #[must_use]
    pub fn log_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.log_attributes = names.into_iter().map(Into::into).collect();
        self
    }

    /// Returns whether debug mode is on.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    fn classify(&self, error: anyhow::Error) -> HttpError {
        let error = match error.downcast::<HttpError>() {
            Ok(http_error) => return http_error,
            Err(error) => error,
        };

        match self.mapper.map(error) {
            Ok(http_error) => http_error,
            Err(failure) => internal_error(&failure),
        }
    }

    fn logged_attributes(&self, attributes: &Attributes) -> IndexMap<String, Value> {
        self.log_attributes
            .iter()
            .map(|name| {
                let value = attributes.get(name).cloned().unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect()
    }

    fn respond(&self, attributes: &Attributes, error: &HttpError) -> Response {
        let status = error.status_code();
        let Some(accept) = attributes.get_str(ACCEPT) else {
            return Response::empty(status);
        };

        let body = if error.is_client_error() || self.debug {
            error.clone()
        } else {
            error.to_minimal()
        };

        let encoded = value_to_data(&body)
            .map_err(anyhow::Error::from)
            .and_then(|data| self.encoder.encode(&data, accept).map_err(anyhow::Error::from))
            .and_then(|text| Response::with_body(status, accept, text).map_err(anyhow::Error::from));

        match encoded {
            Ok(response) => response,
            Err(failure) => {
                tracing::error!(
                    error = %failure,
                    accept,
                    status = error.status,
                    "failed to encode error response"
                );
                Response::empty(status)
            }
        }
    }
}

impl std::fmt::Debug for ErrorNormalizationMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorNormalizationMiddleware")
            .field("debug", &self.debug)
            .field("log_attributes", &self.log_attributes)
            .finish_non_exhaustive()
    }
}

impl Middleware for ErrorNormalizationMiddleware {
    fn name(&self) -> &'static str {
        "error_normalization"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, anyhow::Result<Response>> {
        Box::pin(async move {
            let method = request.method().to_string();
            let uri = request
                .uri()
                .path_and_query()
                .map_or_else(|| request.uri().path().to_string(), ToString::to_string);

            let error = match next.run(ctx, request).await {
                Ok(response) => return Ok(response),
                Err(error) => self.classify(error),
            };

            let context = LogContext {
                method,
                uri,
                status: error.status,
                attributes: self.logged_attributes(ctx.attributes()),
                error: value_to_data(&error).unwrap_or(Value::Null),
            };
            if error.is_client_error() {
                self.logger.info(LOG_MESSAGE, &context);
            } else {
                self.logger.error(LOG_MESSAGE, &context);
            }

            Ok(self.respond(ctx.attributes(), &error))
        })
    }
}

/// Wraps a failure nobody recognised.
fn internal_error(failure: &anyhow::Error) -> HttpError {
    let message = failure.to_string();
    HttpError::internal_server_error()
        .with_detail(message.clone())
        .with_extra(
            "error",
            json!({
                "name": error_name(failure),
                "message": message,
                "trace": format!("{failure:?}"),
            }),
        )
}

fn error_name(failure: &anyhow::Error) -> &'static str {
    if failure.is::<SchemaError>() {
        "SchemaError"
    } else if failure.is::<DecodeError>() {
        "DecodeError"
    } else if failure.is::<EncodeError>() {
        "EncodeError"
    } else if failure.is::<DataError>() {
        "DataError"
    } else if failure.is::<BodyReadError>() {
        "BodyReadError"
    } else {
        "Error"
    }
}
