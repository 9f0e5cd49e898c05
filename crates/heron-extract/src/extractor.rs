//! Core extractor trait.

use crate::ExtractionError;
use heron_core::ApiRequest;

/// Types that can be read out of an [`ApiRequest`].
///
/// # Example
///
/// ```rust
/// use heron_core::ApiRequest;
/// use heron_extract::{ExtractionError, ExtractionSource, FromRequest};
///
/// struct Tenant(String);
///
/// impl FromRequest for Tenant {
///     fn from_request(req: &ApiRequest) -> Result<Self, ExtractionError> {
///         req.header("x-tenant")
///             .map(|t| Tenant(t.to_string()))
///             .ok_or_else(|| ExtractionError::missing(ExtractionSource::Header, "x-tenant"))
///     }
/// }
/// ```
pub trait FromRequest: Sized {
    /// Extracts this type from the request.
    fn from_request(req: &ApiRequest) -> Result<Self, ExtractionError>;
}

// Optional extraction: `None` on failure
impl<T: FromRequest> FromRequest for Option<T> {
    fn from_request(req: &ApiRequest) -> Result<Self, ExtractionError> {
        Ok(T::from_request(req).ok())
    }
}
