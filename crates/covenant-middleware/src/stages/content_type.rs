//! Content-Type negotiation middleware.
//!
//! Requires a `content-type` header matching one of the supported media
//! types and records the match as the `contentType` attribute. Failures are
//! `415 Unsupported Media Type` with the supported values attached:
//!
//! ```json
//! {
//!   "type": "https://datatracker.ietf.org/doc/html/rfc2616#section-10.4.16",
//!   "title": "Unsupported Media Type",
//!   "status": 415,
//!   "detail": "Allowed content-types: \"application/json\"",
//!   "supportedValues": ["application/json"]
//! }
//! ```

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    stages::{joined_header, quote_values},
    types::{Request, Response},
};
use covenant_core::{ContentTypeNegotiator, HttpError, Negotiator, CONTENT_TYPE};
use http::header;
use std::sync::Arc;

/// Negotiates the request media type.
#[derive(Clone)]
pub struct ContentTypeMiddleware {
    negotiator: Arc<dyn Negotiator>,
}

impl ContentTypeMiddleware {
    /// Creates the stage for the given media types.
    pub fn new<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_negotiator(ContentTypeNegotiator::new(supported))
    }

    /// Creates the stage with a custom negotiator.
    pub fn with_negotiator(negotiator: impl Negotiator + 'static) -> Self {
        Self {
            negotiator: Arc::new(negotiator),
        }
    }

    fn failure(&self, detail: String) -> HttpError {
        HttpError::unsupported_media_type()
            .with_detail(detail)
            .with_extra("supportedValues", self.negotiator.supported_values())
    }
}

impl std::fmt::Debug for ContentTypeMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentTypeMiddleware")
            .field("supported", &self.negotiator.supported_values())
            .finish()
    }
}

impl Middleware for ContentTypeMiddleware {
    fn name(&self) -> &'static str {
        "content_type"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, anyhow::Result<Response>> {
        Box::pin(async move {
            let supported = quote_values(self.negotiator.supported_values());

            let Some(raw) = joined_header(&request, &header::CONTENT_TYPE) else {
                return Err(self.failure(format!("Missing content-type: {supported}")).into());
            };

            let Some(negotiated) = self.negotiator.negotiate(&raw) else {
                return Err(self.failure(format!("Allowed content-types: {supported}")).into());
            };

            tracing::debug!(content_type = %negotiated.value, "negotiated request content type");
            ctx.add_attribute(CONTENT_TYPE, negotiated.value);
            next.run(ctx, request).await
        })
    }
}
