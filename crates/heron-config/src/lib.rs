//! Typed configuration for Heron services.
//!
//! - TOML and JSON files
//! - environment variable overrides
//! - strict parsing that fails on unknown fields
//! - layering: defaults, then file, then environment
//!
//! # Example
//!
//! ```no_run
//! use heron_config::ConfigLoader;
//!
//! # fn main() -> Result<(), heron_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("heron.toml")?
//!     .with_env_prefix("HERON")
//!     .load()?;
//!
//! println!("tokens come from {}", config.dispatch.token_header);
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [dispatch]
//! version_header = "X-Api-Version"
//! token_header = "X-Auth-Token"
//! config_version_header = "X-Conf-Version"
//! max_body_bytes = 1048576
//!
//! [metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! namespace = "heron"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [templates]
//! dir = "templates"
//! ```
//!
//! # Environment Overrides
//!
//! Keys follow `PREFIX__SECTION__KEY`, e.g. `HERON__METRICS__ENABLED=false`
//! or `HERON__LOGGING__LEVEL=debug`.

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HeronConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{DispatchConfig, LogFormat, LoggingSection, MetricsSection, TemplatesSection};
