//! Error logging seam.
//!
//! The error normalization stage reports every failure through an
//! [`ErrorLogger`]. The default, [`TracingErrorLogger`], emits `tracing`
//! events; tests and embedders can inject their own.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Request context attached to an error log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogContext {
    /// Request method.
    pub method: String,
    /// Request path and query.
    pub uri: String,
    /// Response status.
    pub status: u16,
    /// Allow-listed request attributes; unset ones are `null`.
    pub attributes: IndexMap<String, Value>,
    /// The full HTTP error, before any detail is hidden from the client.
    pub error: Value,
}

/// Receives error log entries.
pub trait ErrorLogger: Send + Sync {
    /// Logs a client error.
    fn info(&self, message: &str, context: &LogContext);

    /// Logs a server error.
    fn error(&self, message: &str, context: &LogContext);
}

impl<T: ErrorLogger + ?Sized> ErrorLogger for std::sync::Arc<T> {
    fn info(&self, message: &str, context: &LogContext) {
        (**self).info(message, context);
    }

    fn error(&self, message: &str, context: &LogContext) {
        (**self).error(message, context);
    }
}

/// Logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorLogger;

impl TracingErrorLogger {
    fn render(value: &impl Serialize) -> String {
        serde_json::to_string(value).unwrap_or_default()
    }
}

impl ErrorLogger for TracingErrorLogger {
    fn info(&self, message: &str, context: &LogContext) {
        tracing::info!(
            http.method = %context.method,
            http.uri = %context.uri,
            http.status_code = context.status,
            attributes = %Self::render(&context.attributes),
            error = %Self::render(&context.error),
            "{message}"
        );
    }

    fn error(&self, message: &str, context: &LogContext) {
        tracing::error!(
            http.method = %context.method,
            http.uri = %context.uri,
            http.status_code = context.status,
            attributes = %Self::render(&context.attributes),
            error = %Self::render(&context.error),
            "{message}"
        );
    }
}
