//! # Heron Dispatch
//!
//! Binds business handlers to versioned HTTP methods and serves requests
//! against them.
//!
//! - [`Handler`] / [`bind`] - wrap a one-argument async function and check
//!   its input declaration
//! - [`HandlerSet`] / [`ApiDescriptor`] - all handlers for one path, keyed
//!   by verb and version
//! - [`ApiRegistry`] - path templates to descriptors
//! - [`Authenticator`] - token header to [`Identity`](heron_core::Identity)
//! - [`ResponseRenderer`] / [`MinijinjaRenderer`] - JSON envelopes, pages
//!   and redirects
//! - [`Dispatcher`] - the request pipeline
//!
//! ## Example
//!
//! ```rust,ignore
//! use heron_dispatch::{ApiDescriptor, ApiRegistry, Dispatcher, Handler, HandlerSet};
//!
//! let mut registry = ApiRegistry::new();
//! registry.register(ApiDescriptor::build(
//!     HandlerSet::json("/posts/{id}")
//!         .on("GET", Handler::data(show_post))
//!         .on("GET2", Handler::data(show_post_v2))
//!         .on("DELETE", Handler::empty(delete_post)),
//! )?)?;
//!
//! let dispatcher = Dispatcher::builder(registry)
//!     .authenticator(authenticator)
//!     .build();
//! let response = dispatcher.dispatch(request).await;
//! ```

#![doc(html_root_url = "https://docs.rs/heron-dispatch/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod auth;
mod binder;
mod descriptor;
mod dispatcher;
mod error;
mod registry;
mod render;

pub use auth::{Authenticator, TokenDecoder, TokenStore, DEFAULT_TOKEN_HEADER};
pub use binder::{bind, BoxFuture, Handler, MethodBinding};
pub use descriptor::{
    ApiDescriptor, HandlerSet, MethodKey, OutputKind, Verb, DOCUMENT_HANDLER, MAX_VERSION,
};
pub use dispatcher::{Dispatcher, DispatcherBuilder, BAD_API_VERSION, NO_API_AT_PATH};
pub use error::{RegistrationError, RenderError, BAD_HANDLER_FORMAT};
pub use registry::ApiRegistry;
pub use render::{
    MinijinjaRenderer, ResponseRenderer, TemplateRenderer, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE,
};

/// Re-exported for implementing [`TokenStore`].
pub use async_trait::async_trait;
