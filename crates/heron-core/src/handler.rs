//! Handler signatures and their results.
//!
//! Business handlers come in three shapes:
//!
//! | Signature | Returns | Output kinds |
//! |---|---|---|
//! | [`Signature::ErrorOnly`] | `HandlerResult<()>` | both |
//! | [`Signature::DataAndError`] | `HandlerResult<T: Serialize>` | both |
//! | [`Signature::DataTemplateAndError`] | `HandlerResult<Page<T>>` | document only |
//!
//! After invocation the result is erased into a [`Reply`].

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// The closed set of handler signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signature {
    /// Returns only success or an error.
    ErrorOnly,
    /// Returns data or an error.
    DataAndError,
    /// Returns data plus a template name, or an error.
    DataTemplateAndError,
}

impl Signature {
    /// Number of values the signature returns, error included.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::ErrorOnly => 1,
            Self::DataAndError => 2,
            Self::DataTemplateAndError => 3,
        }
    }

    /// Returns `true` if the signature is only valid on document APIs.
    #[must_use]
    pub const fn is_document_only(self) -> bool {
        matches!(self, Self::DataTemplateAndError)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ErrorOnly => "error-only",
            Self::DataAndError => "data+error",
            Self::DataTemplateAndError => "data+template+error",
        };
        f.write_str(name)
    }
}

/// A rendered page: template data plus the template to render it with.
///
/// When no template is named the API's default template is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Data passed to the template.
    pub data: T,
    /// Template name.
    pub template: Option<String>,
}

impl<T> Page<T> {
    /// Renders `data` with the named template.
    pub fn new(template: impl Into<String>, data: T) -> Self {
        Self {
            data,
            template: Some(template.into()),
        }
    }

    /// Renders `data` with the API's default template.
    pub const fn with_default_template(data: T) -> Self {
        Self {
            data,
            template: None,
        }
    }
}

impl<T: Serialize> Page<T> {
    /// Serializes the page data.
    pub fn into_reply(self) -> Result<Reply, serde_json::Error> {
        Ok(Reply::Page {
            data: serde_json::to_value(self.data)?,
            template: self.template,
        })
    }
}

/// A successful handler result, erased to JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nothing to return; rendered as `{}`.
    Empty,
    /// A data payload.
    Data(Value),
    /// A page to render through a template.
    Page {
        /// Template data.
        data: Value,
        /// Template name, `None` for the API default.
        template: Option<String>,
    },
}

impl Reply {
    /// Serializes a data payload.
    pub fn data<T: Serialize>(data: T) -> Result<Self, serde_json::Error> {
        Ok(Self::Data(serde_json::to_value(data)?))
    }

    /// Returns the signature that produces this kind of reply.
    #[must_use]
    pub const fn signature(&self) -> Signature {
        match self {
            Self::Empty => Signature::ErrorOnly,
            Self::Data(_) => Signature::DataAndError,
            Self::Page { .. } => Signature::DataTemplateAndError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arity() {
        assert_eq!(Signature::ErrorOnly.arity(), 1);
        assert_eq!(Signature::DataAndError.arity(), 2);
        assert_eq!(Signature::DataTemplateAndError.arity(), 3);
    }

    #[test]
    fn test_document_only() {
        assert!(Signature::DataTemplateAndError.is_document_only());
        assert!(!Signature::DataAndError.is_document_only());
    }

    #[test]
    fn test_page_into_reply() {
        let reply = Page::new("profile.html", json!({"name": "ada"}))
            .into_reply()
            .unwrap();
        assert_eq!(
            reply,
            Reply::Page {
                data: json!({"name": "ada"}),
                template: Some("profile.html".into()),
            }
        );
        assert_eq!(reply.signature(), Signature::DataTemplateAndError);
    }

    #[test]
    fn test_default_template_page() {
        let page = Page::with_default_template(3);
        assert_eq!(page.template, None);
    }

    #[test]
    fn test_data_reply() {
        #[derive(Serialize)]
        struct Post {
            id: i64,
        }
        let reply = Reply::data(Post { id: 5 }).unwrap();
        assert_eq!(reply, Reply::Data(json!({"id": 5})));
        assert_eq!(Reply::Empty.signature(), Signature::ErrorOnly);
    }
}
