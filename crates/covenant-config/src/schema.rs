//! Configuration schema types.
//!
//! This module defines the structure of each configuration section. The
//! `[logging]` section is [`covenant_telemetry::LogConfig`] itself.

use serde::{Deserialize, Serialize};

/// Negotiation configuration section.
///
/// Lists the values the server supports for each negotiated header, in
/// order of preference.
///
/// # Example
///
/// ```
/// use covenant_config::NegotiationConfig;
///
/// let config = NegotiationConfig {
///     content_types: vec!["application/json".to_string()],
///     accept: vec!["application/json".to_string()],
///     languages: vec!["en".to_string(), "de".to_string()],
/// };
/// assert_eq!(config.languages.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NegotiationConfig {
    /// Request media types accepted through `Content-Type`.
    #[serde(default = "default_media_types")]
    pub content_types: Vec<String>,

    /// Response media types offered through `Accept`.
    #[serde(default = "default_media_types")]
    pub accept: Vec<String>,

    /// Response languages offered through `Accept-Language`.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            content_types: default_media_types(),
            accept: default_media_types(),
            languages: default_languages(),
        }
    }
}

fn default_media_types() -> Vec<String> {
    vec!["application/json".to_string()]
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

/// Error normalization configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Expose full server error details in responses.
    #[serde(default)]
    pub debug: bool,

    /// Request attributes copied into error log entries.
    #[serde(default = "default_log_attributes")]
    pub log_attributes: Vec<String>,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_attributes: default_log_attributes(),
        }
    }
}

fn default_log_attributes() -> Vec<String> {
    vec!["accept".to_string(), "contentType".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiation_defaults() {
        let config = NegotiationConfig::default();
        assert_eq!(config.content_types, vec!["application/json"]);
        assert_eq!(config.accept, vec!["application/json"]);
        assert_eq!(config.languages, vec!["en"]);
    }

    #[test]
    fn test_errors_defaults() {
        let config = ErrorsConfig::default();
        assert!(!config.debug);
        assert_eq!(config.log_attributes, vec!["accept", "contentType"]);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: NegotiationConfig = toml::from_str(r#"languages = ["de"]"#).unwrap();
        assert_eq!(config.languages, vec!["de"]);
        assert_eq!(config.accept, vec!["application/json"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = toml::from_str::<ErrorsConfig>("verbose = true");
        assert!(result.is_err());
    }
}
