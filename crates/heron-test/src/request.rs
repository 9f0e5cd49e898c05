//! Test request builder.

use bytes::Bytes;
use heron_core::ApiRequest;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri};
use serde::Serialize;

use crate::error::TestError;

/// Entry points for building an [`ApiRequest`].
///
/// # Example
///
/// ```ignore
/// let request = TestRequest::post("/posts")
///     .version(2)
///     .token("alice")
///     .json(&json!({"title": "Hello"}))
///     .build()?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TestRequest;

impl TestRequest {
    /// A `GET` request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// A `POST` request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// A `PUT` request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// A `DELETE` request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// A request with any method.
    pub fn method(method: Method, uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(method, uri)
    }
}

/// Builder for test requests.
///
/// Invalid headers or bodies are remembered and reported by
/// [`build`](Self::build), so chains never panic halfway.
#[derive(Debug)]
#[must_use]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    version_header: String,
    token_header: String,
    config_version_header: String,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a builder using the default dispatch header names.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            version_header: "X-Api-Version".to_string(),
            token_header: "X-Auth-Token".to_string(),
            config_version_header: "X-Conf-Version".to_string(),
            error: None,
        }
    }

    /// Uses these header names for [`version`](Self::version),
    /// [`token`](Self::token) and [`config_version`](Self::config_version).
    pub fn header_names(
        mut self,
        version: impl Into<String>,
        token: impl Into<String>,
        config_version: impl Into<String>,
    ) -> Self {
        self.version_header = version.into();
        self.token_header = token.into();
        self.config_version_header = config_version.into();
        self
    }

    /// Sets a header, replacing any previous value.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let parsed = HeaderName::try_from(name)
            .map_err(|e| TestError::InvalidHeader(format!("{name}: {e}")))
            .and_then(|n| {
                HeaderValue::try_from(value.as_ref())
                    .map(|v| (n, v))
                    .map_err(|e| TestError::InvalidHeader(format!("{name}: {e}")))
            });
        match parsed {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(e) => self.fail(e),
        }
        self
    }

    /// Sets the API version header.
    pub fn version(self, version: u32) -> Self {
        let name = self.version_header.clone();
        self.header(name, version.to_string())
    }

    /// Sets the auth token header.
    pub fn token(self, token: impl AsRef<str>) -> Self {
        let name = self.token_header.clone();
        self.header(name, token)
    }

    /// Sets the client configuration version header.
    pub fn config_version(self, version: i64) -> Self {
        let name = self.config_version_header.clone();
        self.header(name, version.to_string())
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the body to `value` as JSON, with a JSON content type.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Bytes::from(bytes),
            Err(e) => self.fail(TestError::Json(e)),
        }
        self.header(header::CONTENT_TYPE.as_str(), "application/json")
    }

    fn fail(&mut self, error: TestError) {
        self.error.get_or_insert(error);
    }

    /// Builds the request.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while building, or
    /// [`TestError::RequestBuild`] if the URI does not parse.
    pub fn build(self) -> Result<ApiRequest, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("Invalid URI: {e}")))?;
        Ok(ApiRequest::new(self.method, uri, self.headers, self.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_with_query() {
        let request = TestRequest::get("/posts?page=2").build().unwrap();
        assert_eq!(*request.method(), Method::GET);
        assert_eq!(request.path(), "/posts");
        assert_eq!(request.query(), Some("page=2"));
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_dispatch_headers() {
        let request = TestRequest::post("/posts")
            .version(3)
            .token("alice")
            .config_version(12)
            .build()
            .unwrap();
        assert_eq!(request.header("x-api-version"), Some("3"));
        assert_eq!(request.header("x-auth-token"), Some("alice"));
        assert_eq!(request.header("x-conf-version"), Some("12"));
    }

    #[test]
    fn test_custom_header_names() {
        let request = TestRequest::get("/")
            .header_names("Api-Version", "Authorization", "Conf")
            .token("t")
            .build()
            .unwrap();
        assert_eq!(request.header("authorization"), Some("t"));
        assert_eq!(request.header("x-auth-token"), None);
    }

    #[test]
    fn test_json_body() {
        let request = TestRequest::put("/posts/1")
            .json(&json!({"title": "Hi"}))
            .build()
            .unwrap();
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body().as_ref(), br#"{"title":"Hi"}"#);
    }

    #[test]
    fn test_invalid_header_reported_at_build() {
        let result = TestRequest::get("/")
            .header("bad header", "x")
            .version(2)
            .build();
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }

    #[test]
    fn test_invalid_uri() {
        let result = TestRequest::get("http://[::1").build();
        assert!(matches!(result, Err(TestError::RequestBuild(_))));
    }
}
