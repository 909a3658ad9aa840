//! # Covenant
//!
//! **HTTP contract layer for Rust services**
//!
//! Covenant sits between an HTTP server and domain logic and provides:
//!
//! - **Content negotiation** – `Accept`, `Accept-Language` and `Content-Type`
//!   resolved against the values a service supports
//! - **Contract validation** – attributes, query, headers and body checked
//!   against declared schemas before domain code runs, responses checked after
//! - **Problem-details errors** – every failure normalized into an HTTP error
//!   with redacted invalid-parameter reports, logged once
//!
//! ## Quick Start
//!
//! ```
//! use covenant::prelude::*;
//!
//! let config = CovenantConfig::development();
//! let pipeline = covenant::build_pipeline(&config, Codecs::default());
//!
//! assert_eq!(
//!     pipeline.stage_names(),
//!     vec!["error_normalization", "accept", "accept_language", "content_type"]
//! );
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → ErrorNorm → Accept → AcceptLanguage → ContentType → ContractHandler
//!                                                                     ↓
//! Response ← ErrorNorm ←──────────────────────────────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/covenant/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use covenant_core as core;

// Re-export middleware types
pub use covenant_middleware as middleware;

// Re-export configuration types
pub use covenant_config as config;

// Re-export logging setup
pub use covenant_telemetry as telemetry;

use covenant_config::CovenantConfig;
use covenant_core::Encoder;
use covenant_middleware::pipeline::{Pipeline, PipelineBuilder};
use covenant_middleware::stages::{
    AcceptLanguageMiddleware, AcceptMiddleware, ContentTypeMiddleware,
    ErrorNormalizationMiddleware,
};

/// Returns a pipeline builder with every stage installed from `config`.
///
/// `encoder` renders error bodies in the negotiated media type. Replace a
/// stage on the returned builder to customize it, for instance to install
/// an error mapper, or drop [`Stage::ContentType`](covenant_middleware::Stage)
/// for routes without a request body:
///
/// ```
/// use covenant::prelude::*;
///
/// let config = CovenantConfig::default();
/// let pipeline = covenant::pipeline_builder(&config, Codecs::default())
///     .error_normalization(
///         ErrorNormalizationMiddleware::new(Codecs::default())
///             .with_mapper(|error: anyhow::Error| -> Result<HttpError, anyhow::Error> {
///                 Err(error)
///             }),
///     )
///     .build();
///
/// assert_eq!(pipeline.stage_count(), 4);
/// ```
pub fn pipeline_builder(config: &CovenantConfig, encoder: impl Encoder + 'static) -> PipelineBuilder {
    let negotiation = &config.negotiation;

    tracing::debug!(
        content_types = ?negotiation.content_types,
        accept = ?negotiation.accept,
        languages = ?negotiation.languages,
        debug = config.errors.debug,
        "building pipeline"
    );

    Pipeline::builder()
        .error_normalization(
            ErrorNormalizationMiddleware::new(encoder)
                .debug(config.errors.debug)
                .log_attributes(config.errors.log_attributes.iter().cloned()),
        )
        .accept(AcceptMiddleware::new(negotiation.accept.iter().cloned()))
        .accept_language(AcceptLanguageMiddleware::new(
            negotiation.languages.iter().cloned(),
        ))
        .content_type(ContentTypeMiddleware::new(
            negotiation.content_types.iter().cloned(),
        ))
}

/// Builds the error normalization and negotiation stages from `config`.
pub fn build_pipeline(config: &CovenantConfig, encoder: impl Encoder + 'static) -> Pipeline {
    pipeline_builder(config, encoder).build()
}

/// Prelude module for convenient imports.
///
/// ```
/// use covenant::prelude::*;
/// ```
pub mod prelude {
    pub use covenant_core::{
        Codecs, Decoder, Encoder, HttpError, HttpResult, InvalidParameter, JsonCodec, Schema,
        SchemaError, ShapeSchema, TypedSchema, UrlEncodedCodec, ACCEPT, ACCEPT_LANGUAGE,
        CONTENT_TYPE,
    };

    pub use covenant_middleware::{
        empty_body, full_body, ContractHandler, DomainResponse, ErrorLogger, ErrorMapper,
        ErrorNormalizationMiddleware, MiddlewareContext, Pipeline, Request, RequestHandler,
        Response, Stage, ValidatedRequest,
    };

    pub use covenant_config::{ConfigLoader, CovenantConfig};

    pub use covenant_telemetry::{init_logging, LogConfig, LogFormat};
}
