//! API descriptors.
//!
//! An [`ApiDescriptor`] is one path plus the handlers bound to it, keyed
//! by [`MethodKey`]. Descriptors are built from a [`HandlerSet`], which
//! names each handler by its key: `GET`, `POST2`, `DELETE13`, or `HTML`
//! for the single page handler of a document descriptor.
//!
//! ```rust
//! use heron_core::{DummyInput, HandlerResult};
//! use heron_dispatch::{ApiDescriptor, Handler, HandlerSet, MethodKey};
//!
//! let descriptor = ApiDescriptor::build(
//!     HandlerSet::json("/ping")
//!         .on("GET", Handler::data(|_: DummyInput| async { HandlerResult::Ok("pong") }))
//!         .on("GET2", Handler::empty(|_: DummyInput| async { HandlerResult::Ok(()) })),
//! )
//! .unwrap();
//!
//! let keys: Vec<String> = descriptor.supported_methods().map(|k| k.to_string()).collect();
//! assert_eq!(keys, ["GET", "GET2"]);
//! ```

use std::collections::HashMap;
use std::fmt;

use http::Method;
use indexmap::IndexMap;

use crate::binder::{bind, Handler, MethodBinding};
use crate::error::RegistrationError;

/// Highest API version a method key may carry.
pub const MAX_VERSION: u32 = heron_extract::MAX_API_VERSION;

/// Handler name of a document descriptor's page.
pub const DOCUMENT_HANDLER: &str = "HTML";

/// HTTP verbs a descriptor can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Verb {
    /// All verbs, in registration order.
    pub const ALL: [Self; 4] = [Self::Get, Self::Post, Self::Put, Self::Delete];

    /// Upper-case verb name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// The verb for an HTTP method, if it is one Heron serves.
    #[must_use]
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Self::Get),
            Method::POST => Some(Self::Post),
            Method::PUT => Some(Self::Put),
            Method::DELETE => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verb and API version.
///
/// Version 1 displays as the bare verb; later versions append the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    verb: Verb,
    version: u32,
}

impl MethodKey {
    /// Returns `None` unless `version` is in `1..=99`.
    #[must_use]
    pub const fn new(verb: Verb, version: u32) -> Option<Self> {
        if version >= 1 && version <= MAX_VERSION {
            Some(Self { verb, version })
        } else {
            None
        }
    }

    /// Parses `GET`, `POST2` and the like.
    ///
    /// `GET1` is rejected since version 1 is spelled without a number.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let verb = Verb::ALL.into_iter().find(|v| s.starts_with(v.as_str()))?;
        let rest = &s[verb.as_str().len()..];
        if rest.is_empty() {
            return Self::new(verb, 1);
        }
        if rest.starts_with('0') || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match rest.parse() {
            Ok(version) if version >= 2 => Self::new(verb, version),
            _ => None,
        }
    }

    /// The verb.
    #[must_use]
    pub const fn verb(self) -> Verb {
        self.verb
    }

    /// The API version, starting at 1.
    #[must_use]
    pub const fn version(self) -> u32 {
        self.version
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version > 1 {
            write!(f, "{}{}", self.verb, self.version)
        } else {
            f.write_str(self.verb.as_str())
        }
    }
}

/// What a descriptor's handlers produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// JSON bodies.
    StructuredData,
    /// Rendered HTML pages.
    Document,
}

/// Handlers for one path, before binding.
#[derive(Debug)]
pub struct HandlerSet {
    path: String,
    output: OutputKind,
    template: Option<String>,
    handlers: Vec<(String, Handler)>,
}

impl HandlerSet {
    /// A JSON API at `path`.
    pub fn json(path: impl Into<String>) -> Self {
        Self::new(path, OutputKind::StructuredData)
    }

    /// An HTML page at `path`.
    pub fn document(path: impl Into<String>) -> Self {
        Self::new(path, OutputKind::Document)
    }

    fn new(path: impl Into<String>, output: OutputKind) -> Self {
        Self {
            path: path.into(),
            output,
            template: None,
            handlers: Vec::new(),
        }
    }

    /// Template used when a page does not name one.
    #[must_use]
    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    /// Adds a handler under `name`.
    #[must_use]
    pub fn on(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.handlers.push((name.into(), handler));
        self
    }
}

/// A path and the handlers bound to it.
#[derive(Debug)]
pub struct ApiDescriptor {
    path: String,
    output: OutputKind,
    template: Option<String>,
    bindings: IndexMap<MethodKey, MethodBinding>,
}

impl ApiDescriptor {
    /// Binds every handler in `set`.
    ///
    /// JSON sets are searched over every verb and version 1 to 99. Document
    /// sets only look up [`DOCUMENT_HANDLER`], bound to `GET`.
    ///
    /// # Errors
    ///
    /// Fails when the path is empty, a name is repeated or never visited,
    /// a page handler sits on a JSON set, an input type declares its
    /// slots wrongly, or nothing was bound.
    pub fn build(set: HandlerSet) -> Result<Self, RegistrationError> {
        let HandlerSet {
            path,
            output,
            template,
            handlers,
        } = set;

        if path.is_empty() {
            return Err(RegistrationError::EmptyPath);
        }

        let mut by_name: HashMap<String, Handler> = HashMap::with_capacity(handlers.len());
        for (name, handler) in handlers {
            if by_name.contains_key(&name) {
                return Err(RegistrationError::DuplicateHandler { path, name });
            }
            by_name.insert(name, handler);
        }

        let mut bindings = IndexMap::new();
        match output {
            OutputKind::StructuredData => {
                for verb in Verb::ALL {
                    for version in 1..=MAX_VERSION {
                        let Some(key) = MethodKey::new(verb, version) else {
                            continue;
                        };
                        let Some(handler) = by_name.remove(&key.to_string()) else {
                            continue;
                        };
                        if handler.signature().is_document_only() {
                            return Err(RegistrationError::BadHandlerFormat {
                                path,
                                key: key.to_string(),
                            });
                        }
                        bindings.insert(key, bind(&path, key, handler)?);
                    }
                }
            }
            OutputKind::Document => {
                if let Some(handler) = by_name.remove(DOCUMENT_HANDLER) {
                    let key = MethodKey {
                        verb: Verb::Get,
                        version: 1,
                    };
                    bindings.insert(key, bind(&path, key, handler)?);
                }
            }
        }

        if let Some(name) = by_name.into_keys().min() {
            return Err(RegistrationError::UnvisitedHandler { path, name });
        }
        if bindings.is_empty() {
            return Err(RegistrationError::NoMethods { path });
        }

        tracing::debug!(
            path = %path,
            methods = bindings.len(),
            "api registered"
        );

        Ok(Self {
            path,
            output,
            template,
            bindings,
        })
    }

    /// The path template.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// JSON or pages.
    #[must_use]
    pub const fn output_kind(&self) -> OutputKind {
        self.output
    }

    /// Fallback page template.
    #[must_use]
    pub fn template_name(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// The binding for `key`, if any.
    #[must_use]
    pub fn binding(&self, key: &MethodKey) -> Option<&MethodBinding> {
        self.bindings.get(key)
    }

    /// Registered keys in verb, then version order.
    pub fn supported_methods(&self) -> impl Iterator<Item = MethodKey> + '_ {
        self.bindings.keys().copied()
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Always `false` for a built descriptor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
