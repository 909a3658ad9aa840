//! Pipeline stages.
//!
//! ## Negotiation
//!
//! - [`accept`] - selects the response media type (`accept` attribute)
//! - [`accept_language`] - selects the response language (`accept-language`)
//! - [`content_type`] - selects the request media type (`contentType`)
//!
//! Each negotiation stage only adds its attribute; the request itself is
//! passed on untouched and the body is never read.
//!
//! ## Error normalization
//!
//! - [`error_normalization`] - turns every failure into an HTTP error
//!   response and logs it

pub mod accept;
pub mod accept_language;
pub mod content_type;
pub mod error_normalization;

pub use accept::AcceptMiddleware;
pub use accept_language::AcceptLanguageMiddleware;
pub use content_type::ContentTypeMiddleware;
pub use error_normalization::{ErrorMapper, ErrorNormalizationMiddleware, PassThroughErrorMapper};

use crate::types::Request;
use http::header::HeaderName;

/// Returns every value of a header joined with `", "`, or `None` when the
/// header is absent.
pub(crate) fn joined_header(request: &Request, name: &HeaderName) -> Option<String> {
    let values: Vec<&str> = request
        .headers()
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

/// Renders supported values as `"a", "b"`.
pub(crate) fn quote_values(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("\"{value}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
