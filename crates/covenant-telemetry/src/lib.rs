//! Logging setup for Covenant services.
//!
//! Covenant crates emit `tracing` events and never install a subscriber
//! themselves. Applications call [`init_logging`] once at startup:
//!
//! - **JSON** output for production (one object per event)
//! - **Pretty** output for development
//! - Filtering through `EnvFilter` directives (`"info"`,
//!   `"covenant_middleware=debug,warn"`)
//!
//! # Example
//!
//! ```rust,no_run
//! use covenant_telemetry::{init_logging, LogConfig, LogFormat};
//!
//! let config = LogConfig {
//!     level: "debug".to_string(),
//!     format: LogFormat::Pretty,
//!     ..LogConfig::default()
//! };
//! init_logging(&config).expect("failed to init logging");
//! ```

#![doc(html_root_url = "https://docs.rs/covenant-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
