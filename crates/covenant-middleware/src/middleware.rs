//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every stage implements
//! and the [`RequestHandler`] trait for the terminal handler a pipeline
//! delegates to.
//!
//! Stages return `anyhow::Result<Response>`. A stage that rejects a request
//! returns an error (usually an [`HttpError`](covenant_core::HttpError));
//! the error normalization stage turns whatever reaches it into a response.
//!
//! # Example
//!
//! ```
//! use covenant_core::ACCEPT;
//! use covenant_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};
//!
//! struct AuditLog;
//!
//! impl Middleware for AuditLog {
//!     fn name(&self) -> &'static str {
//!         "audit_log"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, anyhow::Result<Response>> {
//!         Box::pin(async move {
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(accept = ?ctx.attributes().get_str(ACCEPT), "request finished");
//!             response
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core middleware trait.
///
/// Middleware receives a mutable context, the incoming request, and a
/// [`Next`] callback to invoke the rest of the chain.
///
/// # Invariants
///
/// - Middleware MUST call `next.run()` at most once
/// - Middleware that short-circuits returns an error or its own response
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this middleware stage.
    fn name(&self) -> &'static str;

    /// Processes the request through this middleware.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, anyhow::Result<Response>>;
}

/// The terminal handler a pipeline delegates to.
///
/// Handlers only read the context: attributes are settled by the time the
/// request reaches them.
pub trait RequestHandler: Send + Sync {
    /// Handles the request.
    fn handle<'a>(
        &'a self,
        ctx: &'a MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, anyhow::Result<Response>>;
}

impl<T: RequestHandler + ?Sized> RequestHandler for std::sync::Arc<T> {
    fn handle<'a>(
        &'a self,
        ctx: &'a MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, anyhow::Result<Response>> {
        (**self).handle(ctx, request)
    }
}

/// Terminal closure of a chain.
type HandlerFn<'a> = Box<
    dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, anyhow::Result<Response>>
        + Send
        + 'a,
>;

/// Callback to invoke the next middleware in the chain.
///
/// Consumed by [`run`](Self::run), so it can only be called once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More middleware to process.
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain: a handler object.
    Endpoint(&'a dyn RequestHandler),
    /// End of chain: a closure.
    Handler(HandlerFn<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given middleware.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes a [`RequestHandler`].
    pub fn endpoint(handler: &'a dyn RequestHandler) -> Self {
        Self {
            inner: NextInner::Endpoint(handler),
        }
    }

    /// Creates a terminal `Next` that invokes a closure.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, anyhow::Result<Response>>
            + Send
            + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next middleware or handler in the chain.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> anyhow::Result<Response> {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Endpoint(handler) => handler.handle(ctx, request).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{empty_body, ResponseExt};
    use covenant_core::HttpError;
    use http::StatusCode;

    struct Visiting {
        name: &'static str,
    }

    impl Middleware for Visiting {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, anyhow::Result<Response>> {
            Box::pin(async move {
                ctx.add_attribute(format!("visited:{}", self.name), true);
                next.run(ctx, request).await
            })
        }
    }

    struct Rejecting;

    impl Middleware for Rejecting {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut MiddlewareContext,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, anyhow::Result<Response>> {
            Box::pin(async { Err(anyhow::Error::from(HttpError::forbidden())) })
        }
    }

    struct Echo;

    impl RequestHandler for Echo {
        fn handle<'a>(
            &'a self,
            ctx: &'a MiddlewareContext,
            _request: Request,
        ) -> BoxFuture<'a, anyhow::Result<Response>> {
            Box::pin(async move {
                let status = if ctx.attributes().is_empty() {
                    StatusCode::NO_CONTENT
                } else {
                    StatusCode::OK
                };
                Ok(Response::empty(status))
            })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(empty_body())
            .unwrap()
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| Box::pin(async { Ok(Response::empty(StatusCode::OK)) }));

        let response = next.run(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_chain_reaches_endpoint() {
        let first = Visiting { name: "first" };
        let second = Visiting { name: "second" };
        let mut ctx = MiddlewareContext::new();

        let next = Next::new(&first, Next::new(&second, Next::endpoint(&Echo)));
        let response = next.run(&mut ctx, request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(ctx.attributes().contains("visited:first"));
        assert!(ctx.attributes().contains("visited:second"));
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest_of_chain() {
        let visiting = Visiting { name: "after" };
        let mut ctx = MiddlewareContext::new();

        let next = Next::new(&Rejecting, Next::new(&visiting, Next::endpoint(&Echo)));
        let error = next.run(&mut ctx, request()).await.unwrap_err();

        assert_eq!(error.downcast_ref::<HttpError>().unwrap().status, 403);
        assert!(ctx.attributes().is_empty());
    }
}
