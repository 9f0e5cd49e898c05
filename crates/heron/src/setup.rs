//! Assembling a dispatcher from a [`HeronConfig`].

use std::sync::Arc;

use heron_config::{ConfigError, HeronConfig};
use heron_dispatch::{ApiRegistry, Dispatcher, DispatcherBuilder, MinijinjaRenderer, RenderError};
use heron_telemetry::{MetricsCollector, TelemetryError};
use thiserror::Error;

/// Errors raised while turning configuration into a running dispatcher.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The template directory could not be loaded.
    #[error("failed to load templates: {0}")]
    Templates(#[from] RenderError),
}

/// Installs logging and metrics as configured.
///
/// Call once per process, inside a Tokio runtime when metrics are enabled.
/// The returned collector goes to [`DispatcherBuilder::metrics`].
pub fn init_telemetry(config: &HeronConfig) -> Result<Option<Arc<MetricsCollector>>, SetupError> {
    config.validate()?;
    Ok(heron_telemetry::init_telemetry(&config.telemetry())?)
}

/// Starts a dispatcher over `registry` with the configured header names,
/// body limit and templates.
///
/// Authentication and metrics are left to the caller.
pub fn dispatcher(config: &HeronConfig, registry: ApiRegistry) -> Result<DispatcherBuilder, SetupError> {
    config.validate()?;

    let mut builder = Dispatcher::builder(registry).config(config.dispatch.clone());
    if let Some(dir) = &config.templates.dir {
        let templates = MinijinjaRenderer::from_dir(dir)?;
        tracing::info!(
            dir = %dir.display(),
            count = templates.template_names().count(),
            "templates ready"
        );
        builder = builder.templates(Arc::new(templates));
    }
    Ok(builder)
}
