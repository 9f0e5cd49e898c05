//! Resource id from the `{id}` path parameter.

use crate::{ExtractionError, ExtractionSource, FromRequest};
use heron_core::{ApiRequest, Id};

/// Name of the path parameter carrying the resource id.
pub const RESOURCE_ID_PARAM: &str = "id";

/// The resource id from the `{id}` path parameter.
///
/// A missing, non-numeric or zero id is rejected.
///
/// ```rust
/// use heron_core::ApiRequest;
/// use heron_extract::{FromRequest, ResourceId};
///
/// let req = ApiRequest::from(
///     http::Request::builder().uri("/posts/42").body(bytes::Bytes::new()).unwrap(),
/// )
/// .with_params([("id", "42")].into_iter().collect());
///
/// assert_eq!(ResourceId::from_request(&req).unwrap(), ResourceId(42));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceId(pub Id);

impl FromRequest for ResourceId {
    fn from_request(req: &ApiRequest) -> Result<Self, ExtractionError> {
        let raw = req
            .param(RESOURCE_ID_PARAM)
            .ok_or_else(|| ExtractionError::missing(ExtractionSource::Path, RESOURCE_ID_PARAM))?;
        match raw.parse::<Id>() {
            Ok(0) => Err(ExtractionError::invalid_value(
                ExtractionSource::Path,
                RESOURCE_ID_PARAM,
                "must not be zero",
            )),
            Ok(id) => Ok(Self(id)),
            Err(e) => Err(ExtractionError::invalid_value(
                ExtractionSource::Path,
                RESOURCE_ID_PARAM,
                e.to_string(),
            )),
        }
    }
}
