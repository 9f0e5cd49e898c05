//! Test response wrapper.
//!
//! Dispatch failures arrive as `200 OK` with an `{"errcode", "msg"}`
//! envelope, so most assertions here look at the body rather than the
//! status line.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TestError;

/// A dispatched response with helper methods for assertions.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Creates a test response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns `true` for a `302 Found`.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.status == StatusCode::FOUND
    }

    /// Returns a reference to the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the redirect target.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header_str(header::LOCATION.as_str())
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::BodyRead`] if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Json`] if the body does not decode as `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        serde_json::from_slice(&self.body).map_err(TestError::Json)
    }

    /// Deserializes the body as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Json`] if the body is not JSON.
    pub fn json_value(&self) -> Result<Value, TestError> {
        self.json()
    }

    /// The envelope's `errcode`, if the body is an error envelope.
    #[must_use]
    pub fn errcode(&self) -> Option<i64> {
        self.json_value().ok()?.get("errcode")?.as_i64()
    }

    /// The envelope's `msg`, if the body is an error envelope.
    #[must_use]
    pub fn msg(&self) -> Option<String> {
        self.json_value()
            .ok()?
            .get("msg")?
            .as_str()
            .map(str::to_string)
    }

    // Assertion methods

    /// Asserts that the status code equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {}",
            expected, self.status
        );
        self
    }

    /// Asserts the body is an error envelope with `code`.
    ///
    /// # Panics
    ///
    /// Panics if there is no envelope or the code differs.
    pub fn assert_errcode(&self, code: i64) -> &Self {
        let body = String::from_utf8_lossy(&self.body);
        assert_eq!(
            self.errcode(),
            Some(code),
            "Expected errcode {code}, got body: {body}"
        );
        self
    }

    /// Asserts the body is exactly `{"errcode": code, "msg": msg}`.
    ///
    /// # Panics
    ///
    /// Panics if the envelope differs.
    pub fn assert_error(&self, code: i64, msg: &str) -> &Self {
        self.assert_status(StatusCode::OK);
        self.assert_json_eq(&serde_json::json!({"errcode": code, "msg": msg}))
    }

    /// Asserts a `302 Found` to `location` with an empty body.
    ///
    /// # Panics
    ///
    /// Panics if the response is anything else.
    pub fn assert_redirect(&self, location: &str) -> &Self {
        self.assert_status(StatusCode::FOUND);
        self.assert_header(header::LOCATION.as_str(), location);
        assert!(self.body.is_empty(), "Redirect body should be empty");
        self
    }

    /// Asserts that a header exists with the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the header doesn't exist or doesn't match.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found"));
        assert_eq!(
            actual, expected,
            "Header '{name}': expected '{expected}', got '{actual}'"
        );
        self
    }

    /// Asserts that the Content-Type header starts with `expected`.
    ///
    /// # Panics
    ///
    /// Panics if Content-Type is missing or doesn't match.
    pub fn assert_content_type(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let actual = self
            .content_type()
            .unwrap_or_else(|| panic!("Content-Type header not found"));
        assert!(
            actual.starts_with(expected),
            "Content-Type: expected '{expected}', got '{actual}'"
        );
        self
    }

    /// Asserts that the body equals the expected string.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't match.
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        let body = String::from_utf8_lossy(&self.body);
        assert_eq!(body, expected.as_ref(), "Body mismatch");
        self
    }

    /// Asserts that the JSON body matches the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON or doesn't match.
    pub fn assert_json_eq(&self, expected: &Value) -> &Self {
        let actual = self
            .json_value()
            .unwrap_or_else(|e| panic!("Body should be valid JSON: {e}"));
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }

    /// Asserts that a JSON field exists and equals the expected value.
    ///
    /// `path` is dot separated; numeric segments index arrays.
    ///
    /// # Panics
    ///
    /// Panics if the field doesn't exist or doesn't match.
    pub fn assert_json_field(&self, path: impl AsRef<str>, expected: &Value) -> &Self {
        let path = path.as_ref();
        let json = self
            .json_value()
            .unwrap_or_else(|e| panic!("Body should be valid JSON: {e}"));
        let actual = json_path(&json, path)
            .unwrap_or_else(|| panic!("JSON path '{path}' not found in: {json}"));
        assert_eq!(
            actual, expected,
            "JSON field '{path}': expected {expected}, got {actual}"
        );
        self
    }
}

impl From<Response<Bytes>> for TestResponse {
    fn from(response: Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self::new(parts.status, parts.headers, body)
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish()
    }
}

fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match segment.parse::<usize>() {
            Ok(index) => current.get(index)?,
            Err(_) => current.get(segment)?,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_response(body: &str) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        TestResponse::new(StatusCode::OK, headers, Bytes::from(body.to_string()))
    }

    #[test]
    fn test_error_envelope_accessors() {
        let response = json_response(r#"{"errcode":40400,"msg":"Not found"}"#);
        assert_eq!(response.errcode(), Some(40400));
        assert_eq!(response.msg().as_deref(), Some("Not found"));
        response.assert_error(40400, "Not found").assert_errcode(40400);
    }

    #[test]
    fn test_data_body_has_no_errcode() {
        let response = json_response(r#"{"id":3}"#);
        assert_eq!(response.errcode(), None);
        response.assert_json_field("id", &json!(3));
    }

    #[test]
    fn test_json_path_into_arrays() {
        let response = json_response(r#"{"posts":[{"title":"a"},{"title":"b"}]}"#);
        response.assert_json_field("posts.1.title", &json!("b"));
    }

    #[test]
    fn test_redirect() {
        let response: TestResponse = Response::builder()
            .status(StatusCode::FOUND)
            .header(header::LOCATION, "/login")
            .body(Bytes::new())
            .unwrap()
            .into();
        assert!(response.is_redirect());
        assert_eq!(response.location(), Some("/login"));
        response.assert_redirect("/login");
    }

    #[test]
    #[should_panic(expected = "Expected errcode")]
    fn test_assert_errcode_mismatch() {
        json_response(r#"{"errcode":40000,"msg":"X"}"#).assert_errcode(50000);
    }

    #[test]
    fn test_text_and_content_type() {
        let response = json_response("{}");
        assert_eq!(response.text().unwrap(), "{}");
        response.assert_content_type("application/json");
        response.assert_body_eq("{}");
    }
}
