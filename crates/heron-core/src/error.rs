//! Business error envelope and handler error types.
//!
//! Every per-request failure is eventually expressed as an [`ApiError`]: a
//! business [`ErrCode`] plus a human readable message. The dispatcher writes
//! it to the wire as
//!
//! ```json
//! {"errcode": 40400, "msg": "Bad API version"}
//! ```
//!
//! with HTTP status 200. The business code lives in the body, not in the
//! status line.
//!
//! Handlers return [`HandlerError`], which is either a recognized
//! [`ApiError`] or an arbitrary error. Arbitrary errors are reported to
//! clients as a generic [`ErrCode::Internal`] error so their text never
//! leaks.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Message used when an unrecognized error is downgraded to `Internal`.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal error";

/// Result type returned by business handlers.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Business error codes carried in the `errcode` field.
///
/// | Code | Value |
/// |---|---|
/// | `Ok` | 20000 |
/// | `Redirect` | 30200 |
/// | `BadRequest` | 40000 |
/// | `Unauthorized` | 40100 |
/// | `Forbidden` | 40300 |
/// | `NotFound` | 40400 |
/// | `Internal` | 50000 |
/// | `ThirdPartyAuthFailed` | 50300 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ErrCode {
    /// Success.
    Ok,
    /// Document-mode control signal: redirect to the URL in the message.
    Redirect,
    /// Malformed query string or body.
    BadRequest,
    /// Missing, invalid or insufficient credential.
    Unauthorized,
    /// Caller is known but not allowed.
    Forbidden,
    /// Unknown API version, method or resource.
    NotFound,
    /// Handler failure or contract violation.
    Internal,
    /// An upstream identity provider rejected the caller.
    ThirdPartyAuthFailed,
}

impl ErrCode {
    /// Returns the wire value of this code.
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Self::Ok => 20000,
            Self::Redirect => 30200,
            Self::BadRequest => 40000,
            Self::Unauthorized => 40100,
            Self::Forbidden => 40300,
            Self::NotFound => 40400,
            Self::Internal => 50000,
            Self::ThirdPartyAuthFailed => 50300,
        }
    }

    /// Looks up a code by its wire value.
    #[must_use]
    pub const fn from_value(value: i32) -> Option<Self> {
        match value {
            20000 => Some(Self::Ok),
            30200 => Some(Self::Redirect),
            40000 => Some(Self::BadRequest),
            40100 => Some(Self::Unauthorized),
            40300 => Some(Self::Forbidden),
            40400 => Some(Self::NotFound),
            50000 => Some(Self::Internal),
            50300 => Some(Self::ThirdPartyAuthFailed),
            _ => None,
        }
    }

    /// Returns `true` for codes produced by a misbehaving client.
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(
            self,
            Self::BadRequest | Self::Unauthorized | Self::Forbidden | Self::NotFound
        )
    }
}

impl From<ErrCode> for i32 {
    fn from(code: ErrCode) -> Self {
        code.value()
    }
}

impl TryFrom<i32> for ErrCode {
    type Error = UnknownErrCode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or(UnknownErrCode(value))
    }
}

impl fmt::Display for ErrCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// A wire value that is not a known [`ErrCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown error code: {0}")]
pub struct UnknownErrCode(pub i32);

/// A business error: code plus message.
///
/// Serializes directly into the failure envelope `{"errcode", "msg"}`.
///
/// # Example
///
/// ```
/// use heron_core::{ApiError, ErrCode};
///
/// let err = ApiError::bad_request("title is required");
/// assert_eq!(err.code(), ErrCode::BadRequest);
/// assert_eq!(
///     serde_json::to_string(&err).unwrap(),
///     r#"{"errcode":40000,"msg":"title is required"}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{msg}")]
pub struct ApiError {
    #[serde(rename = "errcode")]
    code: ErrCode,
    msg: String,
}

impl ApiError {
    /// Creates an error with an explicit code and message.
    #[must_use]
    pub fn new(code: ErrCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
        }
    }

    /// Creates an error carrying only a code.
    #[must_use]
    pub fn with_code(code: ErrCode) -> Self {
        Self::new(code, "No extra info")
    }

    /// Creates an `Internal` error with the given message.
    #[must_use]
    pub fn with_msg(msg: impl Into<String>) -> Self {
        Self::new(ErrCode::Internal, msg)
    }

    /// Creates a `BadRequest` error.
    #[must_use]
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrCode::BadRequest, msg)
    }

    /// Creates an `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrCode::Unauthorized, msg)
    }

    /// Creates a `Forbidden` error.
    #[must_use]
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrCode::Forbidden, msg)
    }

    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrCode::NotFound, msg)
    }

    /// Creates an `Internal` error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrCode::Internal, msg)
    }

    /// Creates a `ThirdPartyAuthFailed` error.
    #[must_use]
    pub fn third_party_auth_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrCode::ThirdPartyAuthFailed, msg)
    }

    /// Creates a redirect signal for document handlers.
    ///
    /// The target URL travels in the message field.
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::new(ErrCode::Redirect, location)
    }

    /// Converts any error into an `ApiError`.
    ///
    /// An `ApiError` passes through unchanged; anything else becomes
    /// `Internal` carrying the error's text.
    #[must_use]
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        match err.downcast_ref::<Self>() {
            Some(api) => api.clone(),
            None => Self::internal(err.to_string()),
        }
    }

    /// Returns the business code.
    #[must_use]
    pub const fn code(&self) -> ErrCode {
        self.code
    }

    /// Returns the message (the target URL for redirects).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns `true` if this is a redirect signal.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.code == ErrCode::Redirect
    }
}

/// The predefined "NotFound error".
#[must_use]
pub fn not_found_err() -> ApiError {
    ApiError::not_found("NotFound error")
}

/// The predefined "Unauthorized error".
#[must_use]
pub fn unauthorized_err() -> ApiError {
    ApiError::unauthorized("Unauthorized error")
}

/// The predefined "Forbidden error".
#[must_use]
pub fn forbidden_err() -> ApiError {
    ApiError::forbidden("Forbidden error")
}

/// The predefined "Internal error".
#[must_use]
pub fn internal_err() -> ApiError {
    ApiError::internal(GENERIC_INTERNAL_MESSAGE)
}

/// Error returned by a business handler.
///
/// `Api` errors reach the client as-is. `Other` errors are logged and then
/// reported as a generic `Internal` error. An [`ApiError`] carried inside an
/// `anyhow::Error` (for example from `?` in an `anyhow::Result` helper) is
/// unwrapped back into `Api` rather than downgraded.
///
/// # Example
///
/// ```
/// use heron_core::{ApiError, HandlerError, HandlerResult};
///
/// fn load(id: i64) -> HandlerResult<String> {
///     if id > 100 {
///         return Err(ApiError::not_found("no such post").into());
///     }
///     let raw = std::fs::read_to_string("/definitely/missing")?;
///     Ok(raw)
/// }
///
/// assert!(matches!(load(101), Err(HandlerError::Api(_))));
/// assert!(matches!(load(1), Err(HandlerError::Other(_))));
/// ```
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A business error with a known code.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Any other failure.
    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => Self::Api(api),
            Err(err) => Self::Other(err),
        }
    }
}

impl HandlerError {
    /// Wraps an arbitrary error.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(anyhow::Error::new(err))
    }

    /// Returns the business error, if this is one.
    #[must_use]
    pub const fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Other(_) => None,
        }
    }

    /// Converts into the error the client will see.
    ///
    /// Unrecognized errors lose their text and become [`internal_err`].
    #[must_use]
    pub fn into_api_error(self) -> ApiError {
        match self {
            Self::Api(err) => err,
            Self::Other(err) => err.downcast::<ApiError>().unwrap_or_else(|_| internal_err()),
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::other(err)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::other(err)
    }
}
