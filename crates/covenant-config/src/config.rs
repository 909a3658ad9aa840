//! Main configuration types.
//!
//! This module provides the top-level [`CovenantConfig`] struct and its builder.

use covenant_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ErrorsConfig, NegotiationConfig};

/// Complete Covenant configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use covenant_config::CovenantConfig;
///
/// let config = CovenantConfig::default();
/// assert_eq!(config.negotiation.accept, vec!["application/json"]);
/// assert!(!config.errors.debug);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct CovenantConfig {
    /// Supported values for content negotiation.
    #[serde(default)]
    pub negotiation: NegotiationConfig,

    /// Error normalization settings.
    #[serde(default)]
    pub errors: ErrorsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LogConfig,
}

impl CovenantConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use covenant_config::{CovenantConfig, NegotiationConfig};
    ///
    /// let config = CovenantConfig::builder()
    ///     .negotiation(NegotiationConfig {
    ///         languages: vec!["de".to_string()],
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.negotiation.languages, vec!["de"]);
    /// ```
    #[must_use]
    pub fn builder() -> CovenantConfigBuilder {
        CovenantConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - A negotiation list is empty
    /// - A media type is not `type/subtype`
    /// - A language is not a language tag or `*`
    /// - The log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let negotiation = &self.negotiation;

        validate_list("negotiation.content_types", &negotiation.content_types, is_media_type)?;
        validate_list("negotiation.accept", &negotiation.accept, is_media_type)?;
        validate_list("negotiation.languages", &negotiation.languages, is_language_tag)?;

        if let Some(name) = self.errors.log_attributes.iter().find(|name| name.is_empty()) {
            return Err(ConfigError::invalid_value(
                "errors.log_attributes",
                format!("invalid attribute name: {name:?}"),
            ));
        }

        self.logging
            .validate()
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))
    }

    /// Create a development configuration preset.
    ///
    /// Server error details are exposed and logs are pretty-printed at
    /// debug level.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.errors.debug = true;
        config.logging = LogConfig::development();
        config
    }

    /// Create a production configuration preset.
    ///
    /// Server error bodies are minimal and logs are JSON at info level.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.errors.debug = false;
        config.logging = LogConfig::production();
        config
    }
}

fn validate_list(
    field: &str,
    values: &[String],
    accepts: fn(&str) -> bool,
) -> Result<(), ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::invalid_value(field, "must not be empty"));
    }

    match values.iter().find(|value| !accepts(value)) {
        Some(value) => Err(ConfigError::invalid_value(
            field,
            format!("invalid entry: {value:?}"),
        )),
        None => Ok(()),
    }
}

fn is_media_type(value: &str) -> bool {
    value.parse::<mime::Mime>().is_ok()
}

/// `*` or alphanumeric subtags of 1 to 8 characters joined by `-`, the
/// first one alphabetic.
fn is_language_tag(value: &str) -> bool {
    if value == "*" {
        return true;
    }

    let mut subtags = value.split('-');
    let primary_ok = subtags.next().is_some_and(|primary| {
        (1..=8).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_alphabetic())
    });

    primary_ok
        && subtags.all(|subtag| {
            (1..=8).contains(&subtag.len()) && subtag.chars().all(|c| c.is_ascii_alphanumeric())
        })
}

/// Builder for [`CovenantConfig`].
#[derive(Debug, Default)]
pub struct CovenantConfigBuilder {
    negotiation: Option<NegotiationConfig>,
    errors: Option<ErrorsConfig>,
    logging: Option<LogConfig>,
}

impl CovenantConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the negotiation configuration.
    #[must_use]
    pub fn negotiation(mut self, negotiation: NegotiationConfig) -> Self {
        self.negotiation = Some(negotiation);
        self
    }

    /// Set the error normalization configuration.
    #[must_use]
    pub fn errors(mut self, errors: ErrorsConfig) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> CovenantConfig {
        CovenantConfig {
            negotiation: self.negotiation.unwrap_or_default(),
            errors: self.errors.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }
}
