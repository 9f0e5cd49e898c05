//! Path resolution.
//!
//! Maps a request path to the [`ApiDescriptor`] whose template matches it.
//! Templates are split on `/`; a `{name}` segment matches any single
//! segment and is captured as a parameter.
//!
//! ```rust
//! use heron_core::{DummyInput, HandlerResult};
//! use heron_dispatch::{ApiDescriptor, ApiRegistry, Handler, HandlerSet};
//!
//! let mut registry = ApiRegistry::new();
//! registry
//!     .register(ApiDescriptor::build(
//!         HandlerSet::json("/posts/{id}")
//!             .on("GET", Handler::empty(|_: DummyInput| async { HandlerResult::Ok(()) })),
//!     ).unwrap())
//!     .unwrap();
//!
//! let (descriptor, params) = registry.resolve("/posts/42").unwrap();
//! assert_eq!(descriptor.path(), "/posts/{id}");
//! assert_eq!(params.get("id"), Some("42"));
//! assert!(registry.resolve("/posts").is_none());
//! ```

use std::sync::Arc;

use heron_core::Params;

use crate::descriptor::ApiDescriptor;
use crate::error::RegistrationError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug)]
struct PathTemplate {
    segments: Vec<Segment>,
    literals: usize,
}

impl PathTemplate {
    fn parse(pattern: &str) -> Self {
        let segments: Vec<Segment> = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        let literals = segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        Self { segments, literals }
    }

    /// `true` if both templates match exactly the same paths.
    ///
    /// Parameter names don't matter, and neither do empty segments.
    fn same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    _ => false,
                })
    }

    fn matches(&self, path: &str) -> Option<Params> {
        let actual: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if actual.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (segment, value) in self.segments.iter().zip(actual) {
            match segment {
                Segment::Literal(expected) if expected == value => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.push(name.as_str(), value),
            }
        }
        Some(params)
    }
}

/// All descriptors a dispatcher serves.
///
/// Built once at startup, then shared read-only.
#[derive(Debug, Default)]
pub struct ApiRegistry {
    apis: Vec<(PathTemplate, Arc<ApiDescriptor>)>,
}

impl ApiRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicatePath`] if a registered template
    /// already matches the same paths, e.g. `/posts/{id}` after
    /// `/posts/{pid}`, or `/posts/` after `/posts`.
    pub fn register(&mut self, descriptor: ApiDescriptor) -> Result<&mut Self, RegistrationError> {
        let template = PathTemplate::parse(descriptor.path());
        if self.apis.iter().any(|(t, _)| t.same_shape(&template)) {
            return Err(RegistrationError::DuplicatePath {
                path: descriptor.path().to_string(),
            });
        }

        self.apis.push((template, Arc::new(descriptor)));
        Ok(self)
    }

    /// The descriptor for `path` and its captured parameters.
    ///
    /// When several templates match, the one with the most literal segments
    /// wins, then the one registered first.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<(Arc<ApiDescriptor>, Params)> {
        let mut best: Option<(usize, &Arc<ApiDescriptor>, Params)> = None;
        for (template, descriptor) in &self.apis {
            let Some(params) = template.matches(path) else {
                continue;
            };
            if best
                .as_ref()
                .map_or(true, |(literals, _, _)| template.literals > *literals)
            {
                best = Some((template.literals, descriptor, params));
            }
        }
        best.map(|(_, descriptor, params)| (Arc::clone(descriptor), params))
    }

    /// Registered paths, in registration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.apis.iter().map(|(_, d)| d.path())
    }

    /// Number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.apis.len()
    }

    /// `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }
}
