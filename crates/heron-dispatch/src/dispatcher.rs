//! Request dispatch.
//!
//! [`Dispatcher::dispatch`] takes one collected request through a fixed
//! pipeline and always produces a response:
//!
//! 1. resolve the path to a descriptor
//! 2. pick the binding for verb plus the version header
//! 3. fill a fresh handler input and call the handler
//! 4. render the reply, the business error, or a redirect
//! 5. record duration and counters, whatever the outcome
//!
//! The first failing step decides the response. Nothing is retried.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use heron_config::DispatchConfig;
use heron_core::{internal_err, ApiError, ApiRequest, HandlerError, Reply};
use heron_extract::api_version;
use heron_telemetry::MetricsSink;
use http::{Method, Response};
use tracing::Instrument;

use crate::auth::Authenticator;
use crate::binder::{CallFailure, Invocation};
use crate::descriptor::{ApiDescriptor, MethodKey, OutputKind, Verb};
use crate::error::BAD_HANDLER_FORMAT;
use crate::registry::ApiRegistry;
use crate::render::{ResponseRenderer, TemplateRenderer};

/// Message for a verb and version with no binding.
pub const BAD_API_VERSION: &str = "Bad API version";

/// Message for a path no descriptor matches.
pub const NO_API_AT_PATH: &str = "No API at path";

/// Serves requests against a registry of descriptors.
///
/// Cheap to clone; clones share the registry and collaborators.
///
/// # Example
///
/// ```rust
/// use heron_core::{ApiRequest, DummyInput, HandlerResult};
/// use heron_dispatch::{ApiDescriptor, ApiRegistry, Dispatcher, Handler, HandlerSet};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut registry = ApiRegistry::new();
/// registry
///     .register(ApiDescriptor::build(
///         HandlerSet::json("/ping")
///             .on("GET", Handler::data(|_: DummyInput| async { HandlerResult::Ok("pong") })),
///     ).unwrap())
///     .unwrap();
///
/// let dispatcher = Dispatcher::builder(registry).build();
/// let request = ApiRequest::from(
///     http::Request::builder().uri("/ping").body(bytes::Bytes::new()).unwrap(),
/// );
/// let response = dispatcher.dispatch(request).await;
/// assert_eq!(response.body().as_ref(), br#""pong""#);
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ApiRegistry>,
    authenticator: Option<Authenticator>,
    renderer: ResponseRenderer,
    metrics: Option<Arc<dyn MetricsSink>>,
    config: Arc<DispatchConfig>,
}

impl Dispatcher {
    /// Starts building a dispatcher over `registry`.
    #[must_use]
    pub fn builder(registry: ApiRegistry) -> DispatcherBuilder {
        DispatcherBuilder::new(registry)
    }

    /// The registry being served.
    #[must_use]
    pub fn registry(&self) -> &ApiRegistry {
        &self.registry
    }

    /// Header names and limits in effect.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Resolves the request's path and dispatches to the matching descriptor.
    ///
    /// Unknown paths get a `NotFound` envelope.
    pub async fn dispatch(&self, req: ApiRequest) -> Response<Bytes> {
        let span = request_span(&req);
        async move {
            let start = Instant::now();
            let method = req.method().clone();

            match self.registry.resolve(req.path()) {
                Some((descriptor, params)) => {
                    let response = self.serve(&descriptor, req.with_params(params)).await;
                    self.finish(&method, Some(descriptor.path()), start, response)
                }
                None => {
                    tracing::debug!("no api at path");
                    let response = self.renderer.error(&ApiError::not_found(NO_API_AT_PATH));
                    self.finish(&method, None, start, response)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Dispatches to `descriptor` directly, skipping path resolution.
    ///
    /// Path parameters must already be on the request.
    pub async fn dispatch_to(&self, descriptor: &ApiDescriptor, req: ApiRequest) -> Response<Bytes> {
        let span = request_span(&req);
        async move {
            let start = Instant::now();
            let method = req.method().clone();

            let response = self.serve(descriptor, req).await;
            self.finish(&method, Some(descriptor.path()), start, response)
        }
        .instrument(span)
        .await
    }

    /// Counts against the matched route template, or the shared unmatched
    /// counter, never the raw path.
    fn finish(
        &self,
        method: &Method,
        route: Option<&str>,
        start: Instant,
        response: Response<Bytes>,
    ) -> Response<Bytes> {
        let elapsed = start.elapsed();
        if let Some(metrics) = &self.metrics {
            match route {
                Some(route) => metrics.record(method.as_str(), route, elapsed),
                None => metrics.record_unmatched(elapsed),
            }
        }
        tracing::debug!(
            duration_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            status = response.status().as_u16(),
            "request served"
        );
        response
    }

    async fn serve(&self, descriptor: &ApiDescriptor, req: ApiRequest) -> Response<Bytes> {
        let version = api_version(&req, &self.config.version_header);
        let Some(key) =
            Verb::from_method(req.method()).and_then(|verb| MethodKey::new(verb, version))
        else {
            return self.reject(descriptor, &ApiError::not_found(BAD_API_VERSION));
        };
        let Some(binding) = descriptor.binding(&key) else {
            tracing::debug!(method_key = %key, "no binding for method key");
            return self.reject(descriptor, &ApiError::not_found(BAD_API_VERSION));
        };

        let request = Arc::new(req);
        let result = binding
            .call(Invocation {
                request: &request,
                authenticator: self.authenticator.as_ref(),
                config: &self.config,
            })
            .await;

        match result {
            Ok(reply) => self.render_reply(descriptor, key, reply),
            Err(CallFailure::Rejected(err)) => self.reject(descriptor, &err),
            Err(CallFailure::Handler(err)) => {
                let err = match err {
                    HandlerError::Api(err) => err,
                    HandlerError::Other(err) => match err.downcast::<ApiError>() {
                        Ok(err) => err,
                        Err(err) => {
                            tracing::error!(method_key = %key, error = %err, "handler failed");
                            internal_err()
                        }
                    },
                };
                self.reject(descriptor, &err)
            }
        }
    }

    fn render_reply(&self, descriptor: &ApiDescriptor, key: MethodKey, reply: Reply) -> Response<Bytes> {
        match (descriptor.output_kind(), reply) {
            (_, Reply::Empty) => self.renderer.empty(),
            (_, Reply::Data(data)) => self.renderer.data(&data),
            (OutputKind::Document, Reply::Page { data, template }) => {
                let Some(name) = template.as_deref().or_else(|| descriptor.template_name()) else {
                    tracing::error!(method_key = %key, "page names no template and api has none");
                    return self.renderer.error(&internal_err());
                };
                self.renderer.page(name, &data)
            }
            (OutputKind::StructuredData, Reply::Page { .. }) => {
                tracing::error!(method_key = %key, "page returned from a json api");
                self.renderer.error(&ApiError::internal(BAD_HANDLER_FORMAT))
            }
        }
    }

    fn reject(&self, descriptor: &ApiDescriptor, err: &ApiError) -> Response<Bytes> {
        if descriptor.output_kind() == OutputKind::Document && err.is_redirect() {
            tracing::debug!(location = err.message(), "redirecting");
            return self.renderer.redirect(err.message());
        }

        if err.code().is_client_error() {
            tracing::debug!(errcode = err.code().value(), msg = err.message(), "request rejected");
        } else {
            tracing::error!(errcode = err.code().value(), msg = err.message(), "request failed");
        }
        self.renderer.error(err)
    }
}

fn request_span(req: &ApiRequest) -> tracing::Span {
    tracing::info_span!(
        "dispatch",
        request_id = %req.id(),
        method = %req.method(),
        path = %req.path(),
    )
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("authenticator", &self.authenticator)
            .field("renderer", &self.renderer)
            .field("metrics", &self.metrics.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    registry: ApiRegistry,
    authenticator: Option<Authenticator>,
    renderer: ResponseRenderer,
    metrics: Option<Arc<dyn MetricsSink>>,
    config: DispatchConfig,
}

impl DispatcherBuilder {
    fn new(registry: ApiRegistry) -> Self {
        Self {
            registry,
            authenticator: None,
            renderer: ResponseRenderer::new(),
            metrics: None,
            config: DispatchConfig::default(),
        }
    }

    /// Resolves identities for inputs with user or admin slots.
    ///
    /// Without one, every caller is anonymous.
    #[must_use]
    pub fn authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Renders page replies with `templates`.
    #[must_use]
    pub fn templates(mut self, templates: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = ResponseRenderer::with_templates(templates);
        self
    }

    /// Records every request to `metrics`.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Header names and body limit.
    ///
    /// The token header here overrides the authenticator's own.
    #[must_use]
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the dispatcher.
    #[must_use]
    pub fn build(self) -> Dispatcher {
        let token_header = self.config.token_header.clone();
        Dispatcher {
            registry: Arc::new(self.registry),
            authenticator: self
                .authenticator
                .map(|auth| auth.with_token_header(token_header)),
            renderer: self.renderer,
            metrics: self.metrics,
            config: Arc::new(self.config),
        }
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("apis", &self.registry.len())
            .field("authenticator", &self.authenticator.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
