//! The incoming request as seen by the dispatcher.
//!
//! [`ApiRequest`] is transport-agnostic: the host server collects the body
//! and hands over method, URI, headers and bytes. The registry attaches
//! matched path parameters before dispatch.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// Time-ordered, so log lines sort naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const INLINE_PARAMS: usize = 4;

/// Path parameters captured from a route template.
///
/// ```
/// use heron_core::Params;
///
/// let mut params = Params::new();
/// params.push("id", "42");
/// assert_eq!(params.get("id"), Some("42"));
/// assert_eq!(params.get("slug"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value of a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if no parameters were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.push(k, v);
        }
        params
    }
}

/// An incoming HTTP request with its body fully collected.
///
/// Handlers that declare a raw-request slot receive it as an
/// `Arc<ApiRequest>`.
///
/// # Example
///
/// ```
/// use heron_core::ApiRequest;
/// use http::Method;
///
/// let request = http::Request::builder()
///     .method(Method::GET)
///     .uri("/posts/7?lang=en")
///     .header("X-Api-Version", "2")
///     .body(bytes::Bytes::new())
///     .unwrap();
///
/// let request = ApiRequest::from(request);
/// assert_eq!(request.path(), "/posts/7");
/// assert_eq!(request.query(), Some("lang=en"));
/// assert_eq!(request.header("x-api-version"), Some("2"));
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: Params,
}

impl ApiRequest {
    /// Creates a request from its parts.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            id: RequestId::new(),
            method,
            uri,
            headers,
            body,
            params: Params::new(),
        }
    }

    /// Replaces the path parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Returns the request id.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the full URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path component.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns all headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value if it is present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the collected body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the captured path parameters.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Returns a single path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

impl From<http::Request<Bytes>> for ApiRequest {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> ApiRequest {
        ApiRequest::from(
            http::Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Bytes::from_static(b"{}"))
                .unwrap(),
        )
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
        assert_ne!(request("/").id(), request("/").id());
    }

    #[test]
    fn test_accessors() {
        let req = request("/posts?draft=true");
        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.path(), "/posts");
        assert_eq!(req.query(), Some("draft=true"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body().as_ref(), b"{}");
        assert!(req.params().is_empty());
    }

    #[test]
    fn test_without_query() {
        assert_eq!(request("/posts").query(), None);
    }

    #[test]
    fn test_with_params() {
        let req = request("/posts/9").with_params([("id", "9")].into_iter().collect());
        assert_eq!(req.param("id"), Some("9"));
        assert_eq!(req.params().len(), 1);
    }

    #[test]
    fn test_params_first_match_wins() {
        let mut params = Params::new();
        params.push("id", "1");
        params.push("id", "2");
        assert_eq!(params.get("id"), Some("1"));
        assert_eq!(params.iter().count(), 2);
    }
}
