//! # Heron
//!
//! **Versioned handler dispatch for JSON and page APIs**
//!
//! Heron binds plain async functions to `VERB` + version keys on a path and
//! runs every request through one fixed pipeline:
//!
//! ```text
//! path → descriptor → X-Api-Version → verb+version → handler
//!                                                       ↓
//!   query → auth → admin → resource id → content → raw request → config version
//!                                                       ↓
//! response ← envelope / page / redirect ←───────────────┘
//! ```
//!
//! Handlers declare what they need through their input type; the
//! dispatcher fills it in and rejects the request before the handler runs
//! if anything is missing.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use heron::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct ShowPost {
//!     #[serde(default)]
//!     full: bool,
//!     #[serde(skip)]
//!     id: Id,
//! }
//!
//! impl InputShape for ShowPost {
//!     fn describe(slots: &mut SlotMap<Self>) {
//!         slots.resource_id(|s| &mut s.id);
//!     }
//! }
//!
//! async fn show_post(input: ShowPost) -> HandlerResult<Post> {
//!     load_post(input.id, input.full).await
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_defaults().with_env_prefix("HERON").load()?;
//!     let metrics = heron::init_telemetry(&config)?;
//!
//!     let mut registry = ApiRegistry::new();
//!     registry.register(ApiDescriptor::build(
//!         HandlerSet::json("/posts/{id}").on("GET", Handler::data(show_post)),
//!     )?)?;
//!
//!     let mut builder = heron::dispatcher(&config, registry)?.authenticator(auth);
//!     if let Some(metrics) = metrics {
//!         builder = builder.metrics(metrics);
//!     }
//!     let dispatcher = builder.build();
//!     // hand `dispatcher.dispatch(request)` to your HTTP server
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/heron/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod setup;

pub use setup::{dispatcher, init_telemetry, SetupError};

// Re-export core types
pub use heron_core as core;

// Re-export request decoding helpers
pub use heron_extract as extract;

// Re-export the dispatch engine
pub use heron_dispatch as dispatch;

// Re-export logging and metrics
pub use heron_telemetry as telemetry;

// Re-export configuration
pub use heron_config as config;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use heron::prelude::*;
/// ```
pub mod prelude {
    pub use heron_core::{
        ApiError, ApiRequest, DummyInput, ErrCode, HandlerError, HandlerResult, Id, Identity,
        InputShape, Page, Role, SlotMap, ANONYMOUS_ID,
    };

    pub use heron_dispatch::{
        async_trait, ApiDescriptor, ApiRegistry, Authenticator, Dispatcher, Handler, HandlerSet,
        MinijinjaRenderer, TokenDecoder, TokenStore,
    };

    pub use heron_config::{ConfigLoader, HeronConfig};
}
