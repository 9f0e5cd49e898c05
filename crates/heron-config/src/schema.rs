//! Configuration sections.

use std::path::PathBuf;

use heron_telemetry::{LogConfig, MetricsConfig};
use serde::{Deserialize, Serialize};

/// Request reading settings used by the dispatcher.
///
/// # Example
///
/// ```
/// use heron_config::DispatchConfig;
///
/// let config = DispatchConfig::default();
/// assert_eq!(config.version_header, "X-Api-Version");
/// assert_eq!(config.max_body_bytes, 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Header carrying the API version.
    #[serde(default = "default_version_header")]
    pub version_header: String,

    /// Header carrying the auth token.
    #[serde(default = "default_token_header")]
    pub token_header: String,

    /// Header carrying the client's config version.
    #[serde(default = "default_config_version_header")]
    pub config_version_header: String,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            version_header: default_version_header(),
            token_header: default_token_header(),
            config_version_header: default_config_version_header(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_version_header() -> String {
    "X-Api-Version".to_string()
}

fn default_token_header() -> String {
    "X-Auth-Token".to_string()
}

fn default_config_version_header() -> String {
    "X-Conf-Version".to_string()
}

const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Prometheus metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Whether request metrics are recorded and exported.
    #[serde(default)]
    pub enabled: bool,

    /// Scrape endpoint bind address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,

    /// Metric name prefix.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Duration histogram buckets, in seconds.
    #[serde(default = "default_buckets")]
    pub buckets: Vec<f64>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
            namespace: default_namespace(),
            buckets: default_buckets(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_namespace() -> String {
    "heron".to_string()
}

fn default_buckets() -> Vec<f64> {
    MetricsConfig::default().duration_buckets
}

impl From<&MetricsSection> for MetricsConfig {
    fn from(section: &MetricsSection) -> Self {
        Self {
            enabled: section.enabled,
            addr: section.addr.clone(),
            namespace: section.namespace.clone(),
            duration_buckets: section.buckets.clone(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Whether a subscriber is installed.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directives, e.g. `info` or `info,heron_dispatch=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Log span open and close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include file and line in each event.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            span_events: false,
            include_location: false,
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl From<&LoggingSection> for LogConfig {
    fn from(section: &LoggingSection) -> Self {
        Self {
            enabled: section.enabled,
            level: section.level.clone(),
            json_format: section.format == LogFormat::Json,
            span_events: section.span_events,
            file_line_info: section.include_location,
            include_target: true,
        }
    }
}

/// Page template section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct TemplatesSection {
    /// Directory holding page templates. Unset means no page rendering.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}
