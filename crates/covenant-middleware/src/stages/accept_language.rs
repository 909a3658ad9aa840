//! Accept-Language negotiation middleware.
//!
//! Requires an `accept-language` header matching a supported language and
//! records the match as the `accept-language` attribute. Both a missing
//! header and a header with no match are `406 Not Acceptable`.

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    stages::{joined_header, quote_values},
    types::{Request, Response},
};
use covenant_core::{AcceptLanguageNegotiator, HttpError, Negotiator, ACCEPT_LANGUAGE};
use http::header;
use std::sync::Arc;

/// Negotiates the response language.
#[derive(Clone)]
pub struct AcceptLanguageMiddleware {
    negotiator: Arc<dyn Negotiator>,
}

impl AcceptLanguageMiddleware {
    /// Creates the stage for the given language tags, in preference order.
    pub fn new<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_negotiator(AcceptLanguageNegotiator::new(supported))
    }

    /// Creates the stage with a custom negotiator.
    pub fn with_negotiator(negotiator: impl Negotiator + 'static) -> Self {
        Self {
            negotiator: Arc::new(negotiator),
        }
    }

    fn failure(&self, detail: String) -> HttpError {
        HttpError::not_acceptable()
            .with_detail(detail)
            .with_extra("supportedValues", self.negotiator.supported_values())
    }
}

impl std::fmt::Debug for AcceptLanguageMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptLanguageMiddleware")
            .field("supported", &self.negotiator.supported_values())
            .finish()
    }
}

impl Middleware for AcceptLanguageMiddleware {
    fn name(&self) -> &'static str {
        "accept_language"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, anyhow::Result<Response>> {
        Box::pin(async move {
            let supported = quote_values(self.negotiator.supported_values());

            let Some(raw) = joined_header(&request, &header::ACCEPT_LANGUAGE) else {
                return Err(self.failure(format!("Missing accept-language: {supported}")).into());
            };

            let Some(negotiated) = self.negotiator.negotiate(&raw) else {
                return Err(self.failure(format!("Allowed accept-languages: {supported}")).into());
            };

            tracing::debug!(language = %negotiated.value, "negotiated response language");
            ctx.add_attribute(ACCEPT_LANGUAGE, negotiated.value);
            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{empty_body, ResponseExt};
    use http::StatusCode;

    fn request(language: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/pets");
        if let Some(value) = language {
            builder = builder.header(header::ACCEPT_LANGUAGE, value);
        }
        builder.body(empty_body()).unwrap()
    }

    async fn run(ctx: &mut MiddlewareContext, request: Request) -> anyhow::Result<Response> {
        let middleware = AcceptLanguageMiddleware::new(["en", "de"]);
        let next = Next::handler(|_ctx, _req| Box::pin(async { Ok(Response::empty(StatusCode::OK)) }));
        middleware.process(ctx, request, next).await
    }

    #[tokio::test]
    async fn test_negotiates_language() {
        let mut ctx = MiddlewareContext::new();
        run(&mut ctx, request(Some("de-CH, en;q=0.8"))).await.unwrap();
        assert_eq!(ctx.attributes().get_str(ACCEPT_LANGUAGE), Some("de"));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let mut ctx = MiddlewareContext::new();
        let error = run(&mut ctx, request(None))
            .await
            .unwrap_err()
            .downcast::<HttpError>()
            .unwrap();

        assert_eq!(error.status, 406);
        let detail = error.detail.unwrap();
        assert!(detail.starts_with("Missing accept-language:"));
        assert!(detail.contains(r#""en", "de""#));
    }

    #[tokio::test]
    async fn test_no_match() {
        let mut ctx = MiddlewareContext::new();
        let error = run(&mut ctx, request(Some("fr")))
            .await
            .unwrap_err()
            .downcast::<HttpError>()
            .unwrap();

        assert_eq!(error.detail.as_deref(), Some(r#"Allowed accept-languages: "en", "de""#));
    }
}
