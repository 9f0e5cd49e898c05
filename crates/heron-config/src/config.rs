//! Root configuration type.

use std::collections::HashSet;
use std::net::SocketAddr;

use heron_telemetry::logging::create_env_filter;
use heron_telemetry::TelemetryConfig;
use http::HeaderName;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, DispatchConfig, LogFormat, LoggingSection, MetricsSection, TemplatesSection};

/// Complete Heron configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables over the defaults.
///
/// # Example
///
/// ```
/// use heron_config::HeronConfig;
///
/// let config = HeronConfig::default();
/// assert_eq!(config.dispatch.token_header, "X-Auth-Token");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HeronConfig {
    /// Request reading settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Prometheus metrics.
    #[serde(default)]
    pub metrics: MetricsSection,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Page templates.
    #[serde(default)]
    pub templates: TemplatesSection,
}

impl HeronConfig {
    /// Checks values that deserialization alone cannot.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when:
    /// - a header name is empty, not a valid HTTP header name, or reused
    /// - the body limit is zero
    /// - metrics are enabled with an unparseable address
    /// - the log level is not a valid filter
    pub fn validate(&self) -> Result<(), ConfigError> {
        let headers = [
            ("dispatch.version_header", &self.dispatch.version_header),
            ("dispatch.token_header", &self.dispatch.token_header),
            (
                "dispatch.config_version_header",
                &self.dispatch.config_version_header,
            ),
        ];

        let mut seen = HashSet::new();
        for (field, name) in headers {
            if name.is_empty() {
                return Err(ConfigError::invalid_value(field, "header name is empty"));
            }
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("invalid header name: {name}"),
                ));
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(ConfigError::validation_error(format!(
                    "header {name} is used for more than one purpose"
                )));
            }
        }

        if self.dispatch.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "dispatch.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.metrics.enabled && self.metrics.addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "metrics.addr",
                format!("invalid socket address: {}", self.metrics.addr),
            ));
        }

        if self.logging.enabled && create_env_filter(&self.logging.level).is_err() {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("invalid filter: {}", self.logging.level),
            ));
        }

        Ok(())
    }

    /// Debug logs in pretty format, with source locations.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.span_events = true;
        config.logging.include_location = true;
        config
    }

    /// Info logs in JSON with metrics enabled.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.metrics.enabled = true;
        config
    }

    /// Telemetry settings for `heron_telemetry::init_telemetry`.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            logging: (&self.logging).into(),
            metrics: (&self.metrics).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(HeronConfig::default().validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        let dev = HeronConfig::development();
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        assert!(dev.validate().is_ok());

        let prod = HeronConfig::production();
        assert!(prod.metrics.enabled);
        assert!(prod.validate().is_ok());
    }

    #[test]
    fn test_empty_header_rejected() {
        let mut config = HeronConfig::default();
        config.dispatch.token_header = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dispatch.token_header"));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut config = HeronConfig::default();
        config.dispatch.version_header = "bad header".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_duplicate_headers_rejected_case_insensitively() {
        let mut config = HeronConfig::default();
        config.dispatch.config_version_header = "x-api-version".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_body_limit_rejected() {
        let mut config = HeronConfig::default();
        config.dispatch.max_body_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_metrics_addr_only_checked_when_enabled() {
        let mut config = HeronConfig::default();
        config.metrics.addr = "nowhere".to_string();
        assert!(config.validate().is_ok());

        config.metrics.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let mut config = HeronConfig::default();
        config.logging.level = "heron=loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_telemetry_conversion() {
        let telemetry = HeronConfig::development().telemetry();
        assert!(!telemetry.logging.json_format);
        assert_eq!(telemetry.logging.level, "debug");
        assert!(!telemetry.metrics.enabled);
    }
}
