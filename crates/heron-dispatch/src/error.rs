//! Registration and rendering errors.

use heron_core::ShapeError;
use thiserror::Error;

/// Message for a handler whose result shape does not fit its descriptor.
pub const BAD_HANDLER_FORMAT: &str = "Bad api-func format";

/// A handler set that cannot be served.
///
/// Raised while building descriptors and the registry, before any request
/// is dispatched. The host should refuse to start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The descriptor has no path.
    #[error("api path must not be empty")]
    EmptyPath,

    /// No handler was bound.
    #[error("api {path} has no methods")]
    NoMethods {
        /// Descriptor path.
        path: String,
    },

    /// A handler name outside the verb/version grid.
    #[error("api {path}: handler `{name}` is never dispatched to")]
    UnvisitedHandler {
        /// Descriptor path.
        path: String,
        /// The handler's declared name.
        name: String,
    },

    /// Two handlers under one name.
    #[error("api {path}: handler `{name}` declared twice")]
    DuplicateHandler {
        /// Descriptor path.
        path: String,
        /// The repeated name.
        name: String,
    },

    /// A templated handler on a structured-data descriptor.
    #[error("api {path}: {key}: Bad api-func format")]
    BadHandlerFormat {
        /// Descriptor path.
        path: String,
        /// Method key of the offending handler.
        key: String,
    },

    /// The handler's input type declares its slots wrongly.
    #[error("api {path}: {key}: {source}")]
    Shape {
        /// Descriptor path.
        path: String,
        /// Method key of the offending handler.
        key: String,
        /// What is wrong with the input type.
        #[source]
        source: ShapeError,
    },

    /// Two descriptors registered under one path.
    #[error("api {path} registered twice")]
    DuplicatePath {
        /// The repeated path.
        path: String,
    },
}

/// Errors from page template rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No template with this name is loaded.
    #[error("template not found: {0}")]
    NotFound(String),

    /// Pages were requested but no renderer is configured.
    #[error("no template renderer configured")]
    NoRenderer,

    /// Template compilation or evaluation failed.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Reading template files failed.
    #[error("failed to read templates: {0}")]
    Io(#[from] std::io::Error),
}
