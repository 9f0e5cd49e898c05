//! Extraction error types.

use heron_core::ApiError;
use std::fmt;

/// Where the failing value was being read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// Path parameters (e.g. `/posts/{id}`).
    Path,
    /// Query string.
    Query,
    /// Request body.
    Body,
    /// HTTP headers.
    Header,
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
            Self::Body => write!(f, "body"),
            Self::Header => write!(f, "header"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractionErrorKind {
    Missing,
    InvalidValue,
    DeserializationFailed,
    EmptyBody,
    PayloadTooLarge,
}

/// A request value that could not be extracted.
///
/// # Example
///
/// ```rust
/// use heron_core::ErrCode;
/// use heron_extract::{ExtractionError, ExtractionSource};
///
/// let err = ExtractionError::deserialization_failed(ExtractionSource::Query, "invalid digit");
/// assert_eq!(err.extraction_source(), ExtractionSource::Query);
/// assert_eq!(err.into_api_error().code(), ErrCode::BadRequest);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractionError {
    extraction_source: ExtractionSource,
    kind: ExtractionErrorKind,
    field: Option<String>,
    message: String,
}

impl ExtractionError {
    /// A required value is absent.
    #[must_use]
    pub fn missing(source: ExtractionSource, field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            extraction_source: source,
            kind: ExtractionErrorKind::Missing,
            message: format!("missing required {source} parameter: {field}"),
            field: Some(field),
        }
    }

    /// A value is present but malformed.
    #[must_use]
    pub fn invalid_value(
        source: ExtractionSource,
        field: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let details = details.into();
        Self {
            extraction_source: source,
            kind: ExtractionErrorKind::InvalidValue,
            message: format!("invalid {source} parameter '{field}': {details}"),
            field: Some(field),
        }
    }

    /// Decoding into the target type failed.
    ///
    /// The decoder's message is kept verbatim.
    #[must_use]
    pub fn deserialization_failed(source: ExtractionSource, error: impl Into<String>) -> Self {
        Self {
            extraction_source: source,
            kind: ExtractionErrorKind::DeserializationFailed,
            message: error.into(),
            field: None,
        }
    }

    /// The body was required but empty.
    #[must_use]
    pub fn empty_body() -> Self {
        Self {
            extraction_source: ExtractionSource::Body,
            kind: ExtractionErrorKind::EmptyBody,
            message: "request body is empty".to_string(),
            field: None,
        }
    }

    /// The body exceeds the configured limit.
    #[must_use]
    pub fn payload_too_large(max_size: usize, actual_size: usize) -> Self {
        Self {
            extraction_source: ExtractionSource::Body,
            kind: ExtractionErrorKind::PayloadTooLarge,
            message: format!("payload too large: max {max_size} bytes, got {actual_size} bytes"),
            field: None,
        }
    }

    /// Returns the extraction source.
    #[must_use]
    pub fn extraction_source(&self) -> ExtractionSource {
        self.extraction_source
    }

    /// Returns the field name if applicable.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if the body exceeded the size limit.
    #[must_use]
    pub fn is_payload_too_large(&self) -> bool {
        self.kind == ExtractionErrorKind::PayloadTooLarge
    }

    /// Converts into the client-facing error.
    ///
    /// Path failures are `NotFound`; everything else is `BadRequest`.
    #[must_use]
    pub fn into_api_error(self) -> ApiError {
        match self.extraction_source {
            ExtractionSource::Path => ApiError::not_found(self.message),
            _ => ApiError::bad_request(self.message),
        }
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExtractionError {}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        err.into_api_error()
    }
}
