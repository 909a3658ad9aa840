//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries per-request state through the pipeline.
//! Its main payload is the request [`Attributes`]: negotiation stages add the
//! values they select, the contract handler validates them, and the error
//! normalization stage reads them back (it runs outermost, so it sees every
//! attribute an inner stage installed before failing).

use covenant_core::Attributes;
use serde_json::Value;

/// Context that flows through the middleware pipeline.
///
/// # Example
///
/// ```
/// use covenant_middleware::context::MiddlewareContext;
/// use covenant_core::ACCEPT;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.add_attribute(ACCEPT, "application/json");
///
/// assert_eq!(ctx.attributes().get_str(ACCEPT), Some("application/json"));
/// ```
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    /// Values attached to the request by middleware.
    attributes: Attributes,
}

impl MiddlewareContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::with_attributes(Attributes::new())
    }

    /// Creates a context seeded with attributes.
    ///
    /// Useful when an outer layer (a router, for instance) has already
    /// attached values such as path parameters.
    #[must_use]
    pub fn with_attributes(attributes: Attributes) -> Self {
        Self { attributes }
    }

    /// Returns the request attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Installs a derived attribute bag.
    ///
    /// Callers derive the new bag with [`Attributes::with`], so existing
    /// entries are always carried over.
    pub fn set_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }

    /// Adds one attribute, keeping every existing one.
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes = self.attributes.with(key, value);
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
