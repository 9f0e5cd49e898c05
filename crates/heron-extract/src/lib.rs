//! # Heron Extract
//!
//! Reads typed values out of an [`ApiRequest`](heron_core::ApiRequest).
//!
//! | Reader | Source | Failure |
//! |--------|--------|---------|
//! | [`Query<T>`] | query string | `BadRequest` |
//! | [`decode_json`] / [`json_body`] | request body | `BadRequest` |
//! | [`ResourceId`] | `{id}` path parameter | `NotFound` |
//! | [`api_version`] | version header | never, defaults to 1 |
//! | [`config_version`] | config version header | never, defaults to 0 |
//! | [`auth_token`] | token header | never, defaults to `""` |
//!
//! Failures are [`ExtractionError`]s, which convert into the
//! client-facing [`ApiError`](heron_core::ApiError).

#![doc(html_root_url = "https://docs.rs/heron-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod extractor;
mod header;
mod json;
mod path;
mod query;

pub use error::{ExtractionError, ExtractionSource};
pub use extractor::FromRequest;
pub use header::{api_version, auth_token, config_version, MAX_API_VERSION};
pub use json::{decode_json, json_body, DEFAULT_MAX_BODY_SIZE};
pub use path::{ResourceId, RESOURCE_ID_PARAM};
pub use query::{decode_query, Query};
