//! Accept negotiation middleware.
//!
//! Selects the response media type and records it as the `accept`
//! attribute. A request without an `Accept` header accepts anything, so it
//! is negotiated as `*/*`. No match is `406 Not Acceptable`.

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    stages::{joined_header, quote_values},
    types::{Request, Response},
};
use covenant_core::{AcceptNegotiator, HttpError, Negotiator, ACCEPT};
use http::header;
use std::sync::Arc;

/// Header value used when the client sends no `Accept` header.
const ANY_MEDIA_TYPE: &str = "*/*";

/// Negotiates the response media type.
#[derive(Clone)]
pub struct AcceptMiddleware {
    negotiator: Arc<dyn Negotiator>,
}

impl AcceptMiddleware {
    /// Creates the stage for the given media types, in preference order.
    pub fn new<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_negotiator(AcceptNegotiator::new(supported))
    }

    /// Creates the stage with a custom negotiator.
    pub fn with_negotiator(negotiator: impl Negotiator + 'static) -> Self {
        Self {
            negotiator: Arc::new(negotiator),
        }
    }
}

impl std::fmt::Debug for AcceptMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptMiddleware")
            .field("supported", &self.negotiator.supported_values())
            .finish()
    }
}

impl Middleware for AcceptMiddleware {
    fn name(&self) -> &'static str {
        "accept"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, anyhow::Result<Response>> {
        Box::pin(async move {
            let raw = joined_header(&request, &header::ACCEPT)
                .unwrap_or_else(|| ANY_MEDIA_TYPE.to_string());

            let Some(negotiated) = self.negotiator.negotiate(&raw) else {
                let supported = self.negotiator.supported_values();
                return Err(HttpError::not_acceptable()
                    .with_detail(format!("Allowed accepts: {}", quote_values(supported)))
                    .with_extra("supportedValues", supported)
                    .into());
            };

            tracing::debug!(accept = %negotiated.value, "negotiated response media type");
            ctx.add_attribute(ACCEPT, negotiated.value);
            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{empty_body, ResponseExt};
    use http::StatusCode;
    use serde_json::json;

    fn request(accept: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/pets");
        if let Some(value) = accept {
            builder = builder.header(header::ACCEPT, value);
        }
        builder.body(empty_body()).unwrap()
    }

    async fn run(ctx: &mut MiddlewareContext, request: Request) -> anyhow::Result<Response> {
        let middleware = AcceptMiddleware::new(["application/json", "application/x-www-form-urlencoded"]);
        let next = Next::handler(|_ctx, _req| Box::pin(async { Ok(Response::empty(StatusCode::OK)) }));
        middleware.process(ctx, request, next).await
    }

    #[tokio::test]
    async fn test_negotiates_best_match() {
        let mut ctx = MiddlewareContext::new();
        run(
            &mut ctx,
            request(Some("application/json;q=0.5, application/x-www-form-urlencoded")),
        )
        .await
        .unwrap();
        assert_eq!(
            ctx.attributes().get_str(ACCEPT),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[tokio::test]
    async fn test_missing_header_accepts_anything() {
        let mut ctx = MiddlewareContext::new();
        run(&mut ctx, request(None)).await.unwrap();
        assert_eq!(ctx.attributes().get_str(ACCEPT), Some("application/json"));
    }

    #[tokio::test]
    async fn test_not_acceptable() {
        let mut ctx = MiddlewareContext::new();
        let error = run(&mut ctx, request(Some("text/html")))
            .await
            .unwrap_err()
            .downcast::<HttpError>()
            .unwrap();

        assert_eq!(error.status, 406);
        assert_eq!(
            error.detail.as_deref(),
            Some(r#"Allowed accepts: "application/json", "application/x-www-form-urlencoded""#)
        );
        assert_eq!(
            error.extra("supportedValues"),
            Some(&json!(["application/json", "application/x-www-form-urlencoded"]))
        );
        assert!(!ctx.attributes().contains(ACCEPT));
    }
}
