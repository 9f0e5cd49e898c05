//! JSON body access.

use crate::{ExtractionError, ExtractionSource};
use heron_core::ApiRequest;
use serde::de::DeserializeOwned;

/// Default maximum body size (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Returns the request body after size checks.
///
/// Empty bodies and bodies over `limit` bytes are rejected.
pub fn json_body(req: &ApiRequest, limit: usize) -> Result<&[u8], ExtractionError> {
    let body = req.body();
    if body.len() > limit {
        return Err(ExtractionError::payload_too_large(limit, body.len()));
    }
    if body.is_empty() {
        return Err(ExtractionError::empty_body());
    }
    Ok(body)
}

/// Decodes the request body as JSON into `T`.
///
/// ```rust
/// use heron_core::ApiRequest;
/// use heron_extract::{decode_json, DEFAULT_MAX_BODY_SIZE};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct NewPost {
///     title: String,
/// }
///
/// let req = ApiRequest::from(
///     http::Request::builder()
///         .method("POST")
///         .uri("/posts")
///         .body(bytes::Bytes::from_static(br#"{"title":"hi"}"#))
///         .unwrap(),
/// );
/// let post: NewPost = decode_json(&req, DEFAULT_MAX_BODY_SIZE).unwrap();
/// assert_eq!(post.title, "hi");
/// ```
pub fn decode_json<T: DeserializeOwned>(req: &ApiRequest, limit: usize) -> Result<T, ExtractionError> {
    let body = json_body(req, limit)?;
    serde_json::from_slice(body)
        .map_err(|e| ExtractionError::deserialization_failed(ExtractionSource::Body, e.to_string()))
}
