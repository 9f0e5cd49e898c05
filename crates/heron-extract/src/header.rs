//! Protocol metadata carried in custom headers.
//!
//! Header names are configurable, so these readers take the name as an
//! argument. None of them fail: absent or malformed values fall back to a
//! default.

use heron_core::ApiRequest;

/// Highest API version a client may select.
pub const MAX_API_VERSION: u32 = 99;

fn int_header(req: &ApiRequest, name: &str) -> Option<i64> {
    req.header(name).and_then(|v| v.trim().parse().ok())
}

/// Reads the requested API version.
///
/// Returns `1` when the header is absent, malformed, or outside
/// `1..=MAX_API_VERSION`.
///
/// ```rust
/// use heron_core::ApiRequest;
/// use heron_extract::api_version;
///
/// let req = ApiRequest::from(
///     http::Request::builder()
///         .uri("/")
///         .header("X-Api-Version", "3")
///         .body(bytes::Bytes::new())
///         .unwrap(),
/// );
/// assert_eq!(api_version(&req, "X-Api-Version"), 3);
/// assert_eq!(api_version(&req, "X-Other"), 1);
/// ```
pub fn api_version(req: &ApiRequest, name: &str) -> u32 {
    match int_header(req, name) {
        Some(v) if (2..=i64::from(MAX_API_VERSION)).contains(&v) => {
            u32::try_from(v).unwrap_or(1)
        }
        _ => 1,
    }
}

/// Reads the client's config version, `0` when absent or malformed.
pub fn config_version(req: &ApiRequest, name: &str) -> i64 {
    int_header(req, name).unwrap_or(0)
}

/// Reads the auth token, `""` when absent.
pub fn auth_token<'a>(req: &'a ApiRequest, name: &str) -> &'a str {
    req.header(name).unwrap_or("")
}
