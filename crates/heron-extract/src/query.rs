//! Query string decoding.
//!
//! Decoding is lenient: keys the target type does not declare are ignored.
//! A declared field whose value does not parse is an error.

use crate::{ExtractionError, ExtractionSource, FromRequest};
use heron_core::ApiRequest;
use serde::de::DeserializeOwned;
use std::ops::Deref;

/// Extractor for URL query string parameters.
///
/// # Example
///
/// ```rust
/// use heron_core::ApiRequest;
/// use heron_extract::{FromRequest, Query};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct ListParams {
///     limit: Option<u32>,
///     search: Option<String>,
/// }
///
/// let req = ApiRequest::from(
///     http::Request::builder()
///         .uri("/posts?limit=10&utm_source=mail")
///         .body(bytes::Bytes::new())
///         .unwrap(),
/// );
///
/// let Query(params) = Query::<ListParams>::from_request(&req).unwrap();
/// assert_eq!(params.limit, Some(10));
/// assert_eq!(params.search, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query<T>(pub T);

impl<T> Query<T> {
    /// Consumes the extractor and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Query<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: DeserializeOwned> FromRequest for Query<T> {
    fn from_request(req: &ApiRequest) -> Result<Self, ExtractionError> {
        decode_query(req.query().unwrap_or("")).map(Query)
    }
}

/// Decodes a raw query string into `T`.
pub fn decode_query<T: DeserializeOwned>(query: &str) -> Result<T, ExtractionError> {
    serde_urlencoded::from_str(query).map_err(|e| {
        ExtractionError::deserialization_failed(ExtractionSource::Query, e.to_string())
    })
}
