//! # Covenant Middleware
//!
//! Middleware pipeline for the Covenant HTTP contract layer.
//!
//! This crate provides the fixed-order pipeline every request flows
//! through, the negotiation and error normalization stages that populate
//! it, and the [`ContractHandler`] that validates requests and responses
//! around domain logic.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → ErrorNorm → Accept → AcceptLanguage → ContentType → ContractHandler
//!                                                                     ↓
//! Response ← ErrorNorm ←──────────────────────────────────────────────┘
//! ```
//!
//! | Stage | Middleware           | Purpose                                   |
//! |-------|----------------------|-------------------------------------------|
//! | 1     | Error Normalization  | Turn every failure into an HTTP error     |
//! | 2     | Accept               | Negotiate the response media type         |
//! | 3     | Accept-Language      | Negotiate the response language           |
//! | 4     | Content-Type         | Negotiate the request media type          |
//!
//! Negotiation stages only add attributes to the [`MiddlewareContext`];
//! the contract handler reads them to pick codecs.
//!
//! ## Example
//!
//! ```
//! use covenant_middleware::pipeline::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 4);
//! assert_eq!(stages[0].name(), "error_normalization");
//! assert_eq!(stages[3].name(), "content_type");
//! ```

#![doc(html_root_url = "https://docs.rs/covenant-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod contract;
pub mod logger;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use context::MiddlewareContext;
pub use contract::{
    ContractBuilder, ContractConfigError, ContractHandler, DomainResponse, ValidatedRequest,
};
pub use logger::{ErrorLogger, LogContext, TracingErrorLogger};
pub use middleware::{BoxFuture, Middleware, Next, RequestHandler};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use stages::{
    AcceptLanguageMiddleware, AcceptMiddleware, ContentTypeMiddleware, ErrorMapper,
    ErrorNormalizationMiddleware, PassThroughErrorMapper,
};
pub use types::{
    empty_body, full_body, read_body, Body, BodyReadError, BoxError, Request, Response,
    ResponseExt,
};
