//! # Covenant Config
//!
//! Typed configuration for the Covenant pipeline.
//!
//! ## Layered Loading
//!
//! Configuration is loaded in layers, each overriding the previous:
//!
//! 1. **Defaults** (or the `development()` / `production()` presets)
//! 2. **Configuration file** (TOML or JSON)
//! 3. **Environment variables** (`PREFIX__SECTION__KEY`)
//!
//! Files are strict: unknown fields are rejected. The result is validated
//! before it is returned.
//!
//! ## Example
//!
//! ```rust,no_run
//! use covenant_config::ConfigLoader;
//!
//! # fn main() -> Result<(), covenant_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("covenant.toml")?
//!     .with_env_prefix("COVENANT")
//!     .load()?;
//!
//! println!("Offering {:?}", config.negotiation.accept);
//! # Ok(())
//! # }
//! ```
//!
//! ## File Format
//!
//! ```toml
//! [negotiation]
//! content_types = ["application/json"]
//! accept = ["application/json"]
//! languages = ["en"]
//!
//! [errors]
//! debug = false
//! log_attributes = ["accept", "contentType"]
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! ```
//!
//! ## Environment Overrides
//!
//! List values are comma-separated:
//!
//! ```bash
//! COVENANT__NEGOTIATION__LANGUAGES=en,de
//! COVENANT__ERRORS__DEBUG=true
//! COVENANT__LOGGING__LEVEL=debug
//! ```

#![doc(html_root_url = "https://docs.rs/covenant-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::*;
pub use loader::*;
pub use schema::*;

pub use covenant_telemetry::{LogConfig, LogFormat};
