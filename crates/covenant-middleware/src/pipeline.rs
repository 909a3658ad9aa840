//! Fixed-order middleware pipeline.
//!
//! Every request flows through the same stages, in the same order, before
//! reaching its handler:
//!
//! 1. **Error Normalization** - outermost; turns any failure into a response
//! 2. **Accept** - negotiates the response media type
//! 3. **Accept-Language** - negotiates the response language
//! 4. **Content-Type** - negotiates the request media type
//!
//! Accept runs before the other negotiation stages so that their failures
//! can still be rendered in the negotiated media type. Stages are optional:
//! a route without a request body simply omits Content-Type. Whatever is
//! installed always runs in this order regardless of registration order.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next, RequestHandler};
use crate::types::{Request, Response};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Middleware stage marker for fixed ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: Error normalization
    ErrorNormalization = 1,
    /// Stage 2: Accept negotiation
    Accept = 2,
    /// Stage 3: Accept-Language negotiation
    AcceptLanguage = 3,
    /// Stage 4: Content-Type negotiation
    ContentType = 4,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ErrorNormalization => "error_normalization",
            Self::Accept => "accept",
            Self::AcceptLanguage => "accept_language",
            Self::ContentType => "content_type",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 4] {
        [
            Self::ErrorNormalization,
            Self::Accept,
            Self::AcceptLanguage,
            Self::ContentType,
        ]
    }
}

/// The fixed-order middleware pipeline.
///
/// Immutable once built; share it across requests behind an `Arc`.
///
/// # Example
///
/// ```
/// use covenant_core::JsonCodec;
/// use covenant_middleware::pipeline::{Pipeline, Stage};
/// use covenant_middleware::stages::{AcceptMiddleware, ErrorNormalizationMiddleware};
///
/// let pipeline = Pipeline::builder()
///     .accept(AcceptMiddleware::new(["application/json"]))
///     .error_normalization(ErrorNormalizationMiddleware::new(JsonCodec))
///     .build();
///
/// assert_eq!(pipeline.stages(), vec![Stage::ErrorNormalization, Stage::Accept]);
/// ```
pub struct Pipeline {
    stages: Vec<(Stage, BoxedMiddleware)>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a request through every stage and then `handler`.
    pub async fn process(
        &self,
        mut ctx: MiddlewareContext,
        request: Request,
        handler: &dyn RequestHandler,
    ) -> anyhow::Result<Response> {
        let next = self.wrap(Next::endpoint(handler));
        next.run(&mut ctx, request).await
    }

    /// Processes a request through every stage and then a handler closure.
    pub async fn process_fn<H>(
        &self,
        mut ctx: MiddlewareContext,
        request: Request,
        handler: H,
    ) -> anyhow::Result<Response>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, anyhow::Result<Response>>
            + Send,
    {
        let next = self.wrap(Next::handler(handler));
        next.run(&mut ctx, request).await
    }

    /// Wraps a terminal `Next` with every stage, back to front.
    fn wrap<'a>(&'a self, terminal: Next<'a>) -> Next<'a> {
        self.stages
            .iter()
            .rev()
            .fold(terminal, |next, (_, middleware)| {
                Next::new(middleware.as_ref(), next)
            })
    }

    /// Returns the installed stages in order.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        self.stages.iter().map(|(stage, _)| *stage).collect()
    }

    /// Returns the names of the installed middleware, in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|(_, mw)| mw.name()).collect()
    }

    /// Returns the number of installed stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for constructing a [`Pipeline`].
///
/// Installing a stage twice replaces the earlier middleware.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: BTreeMap<Stage, BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs middleware at a stage.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, stage: Stage, middleware: M) -> Self {
        self.stages.insert(stage, Arc::new(middleware));
        self
    }

    /// Installs the error normalization stage.
    #[must_use]
    pub fn error_normalization<M: Middleware>(self, middleware: M) -> Self {
        self.stage(Stage::ErrorNormalization, middleware)
    }

    /// Installs the Accept negotiation stage.
    #[must_use]
    pub fn accept<M: Middleware>(self, middleware: M) -> Self {
        self.stage(Stage::Accept, middleware)
    }

    /// Installs the Accept-Language negotiation stage.
    #[must_use]
    pub fn accept_language<M: Middleware>(self, middleware: M) -> Self {
        self.stage(Stage::AcceptLanguage, middleware)
    }

    /// Installs the Content-Type negotiation stage.
    #[must_use]
    pub fn content_type<M: Middleware>(self, middleware: M) -> Self {
        self.stage(Stage::ContentType, middleware)
    }

    /// Removes the middleware installed at a stage, if any.
    #[must_use]
    pub fn without(mut self, stage: Stage) -> Self {
        self.stages.remove(&stage);
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages.into_iter().collect(),
        }
    }
}
