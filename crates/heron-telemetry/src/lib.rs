//! Logging and metrics for Heron services.
//!
//! - **Logging**: `tracing` events rendered by `tracing-subscriber`, JSON or pretty
//! - **Metrics**: a request-duration histogram and per-route counters through the
//!   `metrics` facade, exported in Prometheus format
//!
//! # Example
//!
//! ```rust,ignore
//! use heron_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::default();
//!     let collector = init_telemetry(&config).expect("telemetry");
//!     // hand `collector` to the dispatcher
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{
    init_metrics, route_key, MetricsCollector, MetricsConfig, MetricsSink, ALL_ROUTES,
    UNMATCHED_ROUTE,
};

use std::sync::Arc;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Configuration for logging and metrics together.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

/// Initializes logging, then metrics.
///
/// Returns a collector when metrics are enabled, `None` otherwise.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<Option<Arc<MetricsCollector>>> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;

    if config.metrics.enabled {
        Ok(Some(Arc::new(MetricsCollector::new(&config.metrics.namespace))))
    } else {
        Ok(None)
    }
}
