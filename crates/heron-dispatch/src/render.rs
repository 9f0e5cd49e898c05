//! Response rendering.
//!
//! Business errors travel in the body, not the status line: every JSON
//! response is `200 OK`, and failures carry `{"errcode": .., "msg": ..}`.
//! The only other status is `302 Found` for page redirects.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use heron_core::{internal_err, ApiError};
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderValue, Response, StatusCode};
use minijinja::Environment;
use serde_json::Value;

use crate::error::RenderError;

/// Content type of JSON responses.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type of rendered pages.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

const INTERNAL_ENVELOPE: &str = r#"{"errcode":50000,"msg":"Internal error"}"#;

/// Renders a named template with a data value.
pub trait TemplateRenderer: Send + Sync {
    /// Renders `name` with `data` as its context.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the template is unknown or fails.
    fn render(&self, name: &str, data: &Value) -> Result<String, RenderError>;
}

/// Jinja templates held in memory.
///
/// Every template is visible to every other, so `{% extends %}` and
/// `{% include %}` work across files.
#[derive(Debug, Default, Clone)]
pub struct MinijinjaRenderer {
    sources: BTreeMap<String, String>,
}

impl MinijinjaRenderer {
    /// A renderer with no templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every file under `dir`, named by its path relative to `dir`
    /// with `/` separators.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Io`] if the directory cannot be walked, or
    /// [`RenderError::Template`] if a file is not valid template syntax.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, RenderError> {
        let dir = dir.as_ref();
        let mut renderer = Self::new();
        renderer.load_dir(dir, dir)?;
        renderer.check()?;
        tracing::debug!(
            dir = %dir.display(),
            templates = renderer.sources.len(),
            "templates loaded"
        );
        Ok(renderer)
    }

    fn load_dir(&mut self, root: &Path, dir: &Path) -> Result<(), RenderError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.load_dir(root, &path)?;
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            self.sources.insert(name, fs::read_to_string(&path)?);
        }
        Ok(())
    }

    /// Adds or replaces a template.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Template`] if `source` does not compile.
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<&mut Self, RenderError> {
        let name = name.into();
        let source = source.into();
        Environment::new().add_template(&name, &source)?;
        self.sources.insert(name, source);
        Ok(self)
    }

    /// Names of loaded templates, sorted.
    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    fn environment(&self) -> Result<Environment<'_>, RenderError> {
        let mut env = Environment::new();
        for (name, source) in &self.sources {
            env.add_template(name, source)?;
        }
        Ok(env)
    }

    fn check(&self) -> Result<(), RenderError> {
        self.environment().map(|_| ())
    }
}

impl TemplateRenderer for MinijinjaRenderer {
    fn render(&self, name: &str, data: &Value) -> Result<String, RenderError> {
        if !self.sources.contains_key(name) {
            return Err(RenderError::NotFound(name.to_string()));
        }
        let env = self.environment()?;
        let template = env.get_template(name)?;
        Ok(template.render(data)?)
    }
}

/// Turns replies and errors into HTTP responses.
#[derive(Clone, Default)]
pub struct ResponseRenderer {
    templates: Option<Arc<dyn TemplateRenderer>>,
}

impl ResponseRenderer {
    /// A renderer for JSON only; pages fail with an internal error.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer that can also render pages.
    #[must_use]
    pub fn with_templates(templates: Arc<dyn TemplateRenderer>) -> Self {
        Self {
            templates: Some(templates),
        }
    }

    /// `200` with `value` as the JSON body.
    #[must_use]
    pub fn data(&self, value: &Value) -> Response<Bytes> {
        match serde_json::to_vec(value) {
            Ok(body) => json_response(Bytes::from(body)),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize reply");
                json_response(Bytes::from_static(INTERNAL_ENVELOPE.as_bytes()))
            }
        }
    }

    /// `200` with `{}`.
    #[must_use]
    pub fn empty(&self) -> Response<Bytes> {
        json_response(Bytes::from_static(b"{}"))
    }

    /// `200` with the error envelope.
    #[must_use]
    pub fn error(&self, err: &ApiError) -> Response<Bytes> {
        let body = serde_json::to_vec(err)
            .map_or_else(|_| Bytes::from_static(INTERNAL_ENVELOPE.as_bytes()), Bytes::from);
        json_response(body)
    }

    /// `200` with the rendered page, or the internal error envelope if
    /// rendering fails.
    #[must_use]
    pub fn page(&self, template: &str, data: &Value) -> Response<Bytes> {
        let rendered = self
            .templates
            .as_ref()
            .ok_or(RenderError::NoRenderer)
            .and_then(|t| t.render(template, data));

        match rendered {
            Ok(html) => Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, HTML_CONTENT_TYPE)
                .body(Bytes::from(html))
                .unwrap_or_else(|_| Response::new(Bytes::new())),
            Err(e) => {
                tracing::error!(template, error = %e, "page rendering failed");
                self.error(&internal_err())
            }
        }
    }

    /// `302 Found` to `location`.
    ///
    /// A location that is not a valid header value yields the internal
    /// error envelope instead.
    #[must_use]
    pub fn redirect(&self, location: &str) -> Response<Bytes> {
        let Ok(value) = HeaderValue::from_str(location) else {
            tracing::error!(location, "invalid redirect location");
            return self.error(&internal_err());
        };

        Response::builder()
            .status(StatusCode::FOUND)
            .header(LOCATION, value)
            .body(Bytes::new())
            .unwrap_or_else(|_| Response::new(Bytes::new()))
    }
}

impl std::fmt::Debug for ResponseRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseRenderer")
            .field("templates", &self.templates.is_some())
            .finish()
    }
}

fn json_response(body: Bytes) -> Response<Bytes> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(body)
        .unwrap_or_else(|_| Response::new(Bytes::new()))
}
