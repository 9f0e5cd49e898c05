//! Request metrics.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `{ns}_http_request_duration_seconds` | Histogram | - | Time spent serving requests |
//! | `{ns}_http_request_counter` | Counter | `route` | Served requests; `route="all"` is the total |
//!
//! Routes are keyed by verb plus the request path with `/` replaced by `_`,
//! e.g. `GET_api_posts_7`.
//!
//! # Example
//!
//! ```rust
//! use heron_telemetry::metrics::{MetricsCollector, MetricsSink};
//! use std::time::Duration;
//!
//! let collector = MetricsCollector::new("heron");
//! collector.record("GET", "/api/posts", Duration::from_millis(3));
//! collector.record("GET", "/api/posts?page=2", Duration::from_millis(4));
//!
//! assert_eq!(collector.count("all"), Some(2));
//! assert_eq!(collector.count("GET_api_posts"), Some(2));
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use dashmap::DashMap;
use metrics::{describe_counter, describe_histogram, Counter, Histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

/// Key of the aggregate counter.
pub const ALL_ROUTES: &str = "all";

/// Key shared by every request whose path matched no route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are recorded at all.
    pub enabled: bool,

    /// Address of the Prometheus scrape endpoint (e.g. "0.0.0.0:9090").
    pub addr: String,

    /// Prefix for metric names.
    pub namespace: String,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
            namespace: "heron".to_string(),
            duration_buckets: vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder and its scrape endpoint.
///
/// Does nothing when metrics are disabled. Must run inside a Tokio runtime
/// and before any [`MetricsCollector`] is created, since collectors bind
/// their handles to the recorder installed at creation time.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let (recorder, exporter) = PrometheusBuilder::new()
        .set_buckets(&config.duration_buckets)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .with_http_listener(addr)
        .build()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    let _ = METRICS_HANDLE.set(handle);

    tokio::spawn(async move {
        if let Err(e) = exporter.await {
            tracing::error!(error = ?e, "prometheus exporter stopped");
        }
    });
    tracing::info!(%addr, "prometheus exporter listening");

    describe_histogram!(
        duration_metric(&config.namespace),
        "Total time spent serving requests"
    );
    describe_counter!(counter_metric(&config.namespace), "Total served requests count");

    Ok(())
}

/// Renders metrics in Prometheus text format, if the recorder is installed.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn duration_metric(namespace: &str) -> String {
    format!("{namespace}_http_request_duration_seconds")
}

fn counter_metric(namespace: &str) -> String {
    format!("{namespace}_http_request_counter")
}

/// Builds the per-route counter key: verb plus normalized path.
///
/// The query string is dropped and every `/` becomes `_`.
///
/// ```rust
/// use heron_telemetry::metrics::route_key;
///
/// assert_eq!(route_key("GET", "/api/posts/7?full=1"), "GET_api_posts_7");
/// assert_eq!(route_key("DELETE", "/"), "DELETE_");
/// ```
#[must_use]
pub fn route_key(method: &str, path: &str) -> String {
    let path = match path.find('?') {
        Some(i) if i > 0 => &path[..i],
        _ => path,
    };
    let mut key = String::with_capacity(method.len() + path.len());
    key.push_str(method);
    key.push_str(&path.replace('/', "_"));
    key
}

/// Destination for request observations.
pub trait MetricsSink: Send + Sync {
    /// Records how long one request took.
    fn observe_duration(&self, elapsed: Duration);

    /// Increments the counter for `key`, creating it if needed.
    fn increment_counter(&self, key: &str);

    /// Records one dispatched request.
    ///
    /// Observes `elapsed` and bumps both the aggregate and the route counter.
    /// `route` should be the matched route template, not the raw request
    /// path, so the number of counters stays bounded by the route table.
    fn record(&self, method: &str, route: &str, elapsed: Duration) {
        self.observe_duration(elapsed);
        self.increment_counter(ALL_ROUTES);
        self.increment_counter(&route_key(method, route));
    }

    /// Records a request whose path matched no route.
    ///
    /// All such requests share the [`UNMATCHED_ROUTE`] counter.
    fn record_unmatched(&self, elapsed: Duration) {
        self.observe_duration(elapsed);
        self.increment_counter(ALL_ROUTES);
        self.increment_counter(UNMATCHED_ROUTE);
    }
}

struct RouteCounter {
    handle: Counter,
    served: AtomicU64,
}

impl RouteCounter {
    fn increment(&self) {
        self.handle.increment(1);
        self.served.fetch_add(1, Ordering::Relaxed);
    }
}

/// Request duration and per-route counters.
///
/// Counters are created lazily the first time a route is seen. Creation
/// goes through the map's entry API, so concurrent first hits on a new
/// route share one counter and no increment is lost.
pub struct MetricsCollector {
    counter_name: String,
    duration: Histogram,
    counters: DashMap<String, RouteCounter>,
}

impl MetricsCollector {
    /// Creates a collector bound to the currently installed recorder.
    #[must_use]
    pub fn new(namespace: &str) -> Self {
        let collector = Self {
            counter_name: counter_metric(namespace),
            duration: metrics::histogram!(duration_metric(namespace)),
            counters: DashMap::new(),
        };
        collector.counters.insert(
            ALL_ROUTES.to_string(),
            collector.route_counter(ALL_ROUTES),
        );
        collector
    }

    fn route_counter(&self, key: &str) -> RouteCounter {
        RouteCounter {
            handle: metrics::counter!(self.counter_name.clone(), "route" => key.to_string()),
            served: AtomicU64::new(0),
        }
    }

    /// Returns how many times `key` was counted, if it was ever seen.
    #[must_use]
    pub fn count(&self, key: &str) -> Option<u64> {
        self.counters
            .get(key)
            .map(|c| c.served.load(Ordering::Relaxed))
    }

    /// Returns the number of counters, the aggregate included.
    #[must_use]
    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }
}

impl MetricsSink for MetricsCollector {
    fn observe_duration(&self, elapsed: Duration) {
        self.duration.record(elapsed.as_secs_f64());
    }

    fn increment_counter(&self, key: &str) {
        if let Some(counter) = self.counters.get(key) {
            counter.increment();
            return;
        }
        self.counters
            .entry(key.to_string())
            .or_insert_with(|| self.route_counter(key))
            .increment();
    }
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("counter_name", &self.counter_name)
            .field("counters", &self.counters.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
        assert_eq!(config.namespace, "heron");
        assert!(!config.duration_buckets.is_empty());
    }

    #[test]
    fn test_disabled_init_is_noop() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not an address".to_string(),
            ..MetricsConfig::default()
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(duration_metric("heron"), "heron_http_request_duration_seconds");
        assert_eq!(counter_metric("app"), "app_http_request_counter");
    }

    #[test]
    fn test_route_key() {
        assert_eq!(route_key("GET", "/api/users"), "GET_api_users");
        assert_eq!(route_key("POST", "/api/users?x=1&y=2"), "POST_api_users");
        assert_eq!(route_key("PUT", "?odd"), "PUT?odd");
    }

    #[test]
    fn test_aggregate_exists_up_front() {
        let collector = MetricsCollector::new("test");
        assert_eq!(collector.count(ALL_ROUTES), Some(0));
        assert_eq!(collector.counter_count(), 1);
    }

    #[test]
    fn test_record_creates_route_lazily() {
        let collector = MetricsCollector::new("test");
        assert_eq!(collector.count("GET_a"), None);

        collector.record("GET", "/a", Duration::from_millis(1));
        collector.record("GET", "/a", Duration::from_millis(1));
        collector.record("POST", "/a", Duration::from_millis(1));

        assert_eq!(collector.count("GET_a"), Some(2));
        assert_eq!(collector.count("POST_a"), Some(1));
        assert_eq!(collector.count(ALL_ROUTES), Some(3));
        assert_eq!(collector.counter_count(), 3);
    }

    #[test]
    fn test_unmatched_requests_share_one_counter() {
        let collector = MetricsCollector::new("test");
        for _ in 0..50 {
            collector.record_unmatched(Duration::from_millis(1));
        }

        assert_eq!(collector.count(UNMATCHED_ROUTE), Some(50));
        assert_eq!(collector.count(ALL_ROUTES), Some(50));
        assert_eq!(collector.counter_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_hits_share_one_counter() {
        let collector = Arc::new(MetricsCollector::new("test"));
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let collector = Arc::clone(&collector);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    collector.record("GET", "/fresh/route", Duration::from_micros(50));
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(collector.count("GET_fresh_route"), Some(2));
        assert_eq!(collector.count(ALL_ROUTES), Some(2));
        assert_eq!(collector.counter_count(), 2);
    }

    #[test]
    fn test_many_threads_no_lost_increments() {
        let collector = MetricsCollector::new("test");
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        collector.increment_counter("GET_hot");
                    }
                });
            }
        });
        assert_eq!(collector.count("GET_hot"), Some(2000));
    }

    proptest! {
        #[test]
        fn prop_route_key_has_no_slashes_or_query(
            method in "(GET|POST|PUT|DELETE)",
            segments in prop::collection::vec("[a-z0-9]{1,8}", 0..5),
            query in proptest::option::of("[a-z]=[0-9]"),
        ) {
            let mut path = format!("/{}", segments.join("/"));
            if let Some(q) = &query {
                path.push('?');
                path.push_str(q);
            }
            let key = route_key(&method, &path);
            prop_assert!(key.starts_with(&method));
            prop_assert!(!key.contains('/'));
            prop_assert!(!key.contains('?'));
        }
    }
}
