//! Input shapes and their reserved slots.
//!
//! A handler's input type has two kinds of fields. Free-form fields come
//! from the query string through `serde`. Reserved slots are filled by the
//! dispatcher from the request's protocol metadata.
//!
//! An input type declares its reserved slots by implementing
//! [`InputShape::describe`], handing each slot a typed accessor for the
//! field that receives it. Reserved fields are skipped by `serde`.
//!
//! | Slot | Field type | Filled from |
//! |---|---|---|
//! | user id | [`Id`] | auth token (user or anonymous) |
//! | admin id | [`Id`] | auth token, web-admin role required |
//! | resource id | [`Id`] | the `{id}` path parameter |
//! | content | `Option<C>` | JSON request body |
//! | raw request | `Option<Arc<ApiRequest>>` | the request itself |
//! | config version | `i64` | the config version header |
//!
//! # Example
//!
//! ```
//! use heron_core::{Id, InputShape, SlotMap};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Comment {
//!     text: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct AddComment {
//!     notify: Option<bool>,
//!     #[serde(skip)]
//!     author: Id,
//!     #[serde(skip)]
//!     post: Id,
//!     #[serde(skip)]
//!     comment: Option<Comment>,
//! }
//!
//! impl InputShape for AddComment {
//!     fn describe(slots: &mut SlotMap<Self>) {
//!         slots
//!             .user_id(|s| &mut s.author)
//!             .resource_id(|s| &mut s.post)
//!             .content(|s| &mut s.comment);
//!     }
//! }
//!
//! let shape = SlotMap::<AddComment>::collect().unwrap().descriptor();
//! assert!(shape.requires_auth);
//! assert!(shape.has_resource_id);
//! assert!(shape.has_content);
//! assert!(!shape.allow_anonymous);
//! ```

use crate::identity::Id;
use crate::request::ApiRequest;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Accessor for the field that receives a reserved slot.
pub type Setter<I, T> = fn(&mut I) -> &mut T;

type ContentDecoder<I> = Box<dyn Fn(&mut I, &[u8]) -> Result<(), serde_json::Error> + Send + Sync>;

/// The reserved slots an input shape may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Authenticated user id.
    UserId,
    /// Authenticated web-admin id.
    AdminId,
    /// The `{id}` path parameter.
    ResourceId,
    /// Decoded JSON body.
    Content,
    /// The incoming request.
    RawRequest,
    /// Client config version header.
    ConfigVersion,
}

impl SlotKind {
    /// Returns the slot's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UserId => "user_id",
            Self::AdminId => "admin_id",
            Self::ResourceId => "resource_id",
            Self::Content => "content",
            Self::RawRequest => "raw_request",
            Self::ConfigVersion => "config_version",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An input type whose values are assembled by the dispatcher.
///
/// Free-form fields are deserialized from the query string; unknown query
/// keys are ignored unless the type opts into `deny_unknown_fields`.
pub trait InputShape: DeserializeOwned + Send + 'static {
    /// Declares the reserved slots this input provides.
    ///
    /// The default declares none.
    fn describe(slots: &mut SlotMap<Self>) {
        let _ = slots;
    }
}

/// The "no input" sentinel for handlers that take no parameters.
///
/// Dispatch skips query decoding entirely for this type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DummyInput {}

impl InputShape for DummyInput {}

/// A slot declaration that breaks the input contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// A slot was declared more than once.
    #[error("input `{input}` declares the {slot} slot more than once")]
    DuplicateSlot {
        /// Input type name.
        input: &'static str,
        /// The repeated slot.
        slot: SlotKind,
    },

    /// Both identity slots were declared.
    #[error("input `{input}` declares both user_id and admin_id slots; keep one")]
    ConflictingIdentitySlots {
        /// Input type name.
        input: &'static str,
    },
}

/// Static summary of an input type's reserved slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeDescriptor {
    /// Input type name.
    pub input_type: &'static str,
    /// Content type name, if a content slot is declared.
    pub content_type: Option<&'static str>,
    /// A user-id slot is declared.
    pub requires_auth: bool,
    /// An admin-id slot is declared.
    pub requires_admin: bool,
    /// A resource-id slot is declared.
    pub has_resource_id: bool,
    /// A content slot is declared.
    pub has_content: bool,
    /// A raw-request slot is declared.
    pub has_raw_request: bool,
    /// A config-version slot is declared.
    pub has_config_version: bool,
    /// The user-id slot accepts anonymous callers.
    pub allow_anonymous: bool,
    /// The input is [`DummyInput`].
    pub is_dummy_input: bool,
}

struct ContentSlot<I> {
    type_name: &'static str,
    decode: ContentDecoder<I>,
}

/// Reserved-slot declarations for input type `I`.
///
/// Built by [`SlotMap::collect`], which runs [`InputShape::describe`] and
/// checks the declarations. The dispatcher then uses the `inject_*`
/// methods to fill a fresh input.
pub struct SlotMap<I> {
    user_id: Option<Setter<I, Id>>,
    allow_anonymous: bool,
    admin_id: Option<Setter<I, Id>>,
    resource_id: Option<Setter<I, Id>>,
    content: Option<ContentSlot<I>>,
    raw_request: Option<Setter<I, Option<Arc<ApiRequest>>>>,
    config_version: Option<Setter<I, i64>>,
    repeated: Vec<SlotKind>,
}

impl<I: InputShape> SlotMap<I> {
    /// Collects and validates the slots declared by `I`.
    pub fn collect() -> Result<Self, ShapeError> {
        let mut slots = Self {
            user_id: None,
            allow_anonymous: false,
            admin_id: None,
            resource_id: None,
            content: None,
            raw_request: None,
            config_version: None,
            repeated: Vec::new(),
        };
        I::describe(&mut slots);

        let input = type_name::<I>();
        if let Some(&slot) = slots.repeated.first() {
            return Err(ShapeError::DuplicateSlot { input, slot });
        }
        if slots.user_id.is_some() && slots.admin_id.is_some() {
            return Err(ShapeError::ConflictingIdentitySlots { input });
        }
        Ok(slots)
    }

    /// Summarizes the declared slots.
    #[must_use]
    pub fn descriptor(&self) -> ShapeDescriptor {
        ShapeDescriptor {
            input_type: type_name::<I>(),
            content_type: self.content.as_ref().map(|c| c.type_name),
            requires_auth: self.user_id.is_some(),
            requires_admin: self.admin_id.is_some(),
            has_resource_id: self.resource_id.is_some(),
            has_content: self.content.is_some(),
            has_raw_request: self.raw_request.is_some(),
            has_config_version: self.config_version.is_some(),
            allow_anonymous: self.allow_anonymous,
            is_dummy_input: TypeId::of::<I>() == TypeId::of::<DummyInput>(),
        }
    }
}

impl<I: 'static> SlotMap<I> {
    fn note(&mut self, kind: SlotKind, taken: bool) {
        if taken {
            self.repeated.push(kind);
        }
    }

    /// Declares the user-id slot. Unauthenticated callers are rejected.
    pub fn user_id(&mut self, field: Setter<I, Id>) -> &mut Self {
        self.note(SlotKind::UserId, self.user_id.is_some());
        self.user_id = Some(field);
        self
    }

    /// Declares the user-id slot and lets unauthenticated callers through
    /// as [`ANONYMOUS_ID`](crate::ANONYMOUS_ID).
    pub fn anonymous_user_id(&mut self, field: Setter<I, Id>) -> &mut Self {
        self.user_id(field);
        self.allow_anonymous = true;
        self
    }

    /// Declares the admin-id slot.
    pub fn admin_id(&mut self, field: Setter<I, Id>) -> &mut Self {
        self.note(SlotKind::AdminId, self.admin_id.is_some());
        self.admin_id = Some(field);
        self
    }

    /// Declares the resource-id slot.
    pub fn resource_id(&mut self, field: Setter<I, Id>) -> &mut Self {
        self.note(SlotKind::ResourceId, self.resource_id.is_some());
        self.resource_id = Some(field);
        self
    }

    /// Declares the content slot, decoded from a JSON body as `C`.
    pub fn content<C>(&mut self, field: Setter<I, Option<C>>) -> &mut Self
    where
        C: DeserializeOwned + Send + 'static,
    {
        self.note(SlotKind::Content, self.content.is_some());
        self.content = Some(ContentSlot {
            type_name: type_name::<C>(),
            decode: Box::new(move |input: &mut I, body: &[u8]| {
                let value = serde_json::from_slice::<C>(body)?;
                *field(input) = Some(value);
                Ok(())
            }),
        });
        self
    }

    /// Declares the raw-request slot.
    pub fn raw_request(&mut self, field: Setter<I, Option<Arc<ApiRequest>>>) -> &mut Self {
        self.note(SlotKind::RawRequest, self.raw_request.is_some());
        self.raw_request = Some(field);
        self
    }

    /// Declares the config-version slot.
    pub fn config_version(&mut self, field: Setter<I, i64>) -> &mut Self {
        self.note(SlotKind::ConfigVersion, self.config_version.is_some());
        self.config_version = Some(field);
        self
    }

    /// Writes the user id. No-op if the slot is not declared.
    pub fn inject_user_id(&self, input: &mut I, id: Id) {
        if let Some(field) = self.user_id {
            *field(input) = id;
        }
    }

    /// Writes the admin id. No-op if the slot is not declared.
    pub fn inject_admin_id(&self, input: &mut I, id: Id) {
        if let Some(field) = self.admin_id {
            *field(input) = id;
        }
    }

    /// Writes the resource id. No-op if the slot is not declared.
    pub fn inject_resource_id(&self, input: &mut I, id: Id) {
        if let Some(field) = self.resource_id {
            *field(input) = id;
        }
    }

    /// Decodes `body` into the content slot.
    ///
    /// No-op if the slot is not declared.
    pub fn inject_content(&self, input: &mut I, body: &[u8]) -> Result<(), serde_json::Error> {
        match &self.content {
            Some(slot) => (slot.decode)(input, body),
            None => Ok(()),
        }
    }

    /// Hands the request to the raw-request slot. No-op if not declared.
    pub fn inject_raw_request(&self, input: &mut I, request: Arc<ApiRequest>) {
        if let Some(field) = self.raw_request {
            *field(input) = Some(request);
        }
    }

    /// Writes the config version. No-op if the slot is not declared.
    pub fn inject_config_version(&self, input: &mut I, version: i64) {
        if let Some(field) = self.config_version {
            *field(input) = version;
        }
    }
}

impl<I> fmt::Debug for SlotMap<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotMap")
            .field("input", &type_name::<I>())
            .field("user_id", &self.user_id.is_some())
            .field("allow_anonymous", &self.allow_anonymous)
            .field("admin_id", &self.admin_id.is_some())
            .field("resource_id", &self.resource_id.is_some())
            .field("content", &self.content.as_ref().map(|c| c.type_name))
            .field("raw_request", &self.raw_request.is_some())
            .field("config_version", &self.config_version.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Body {
        title: String,
    }

    #[derive(Debug, Deserialize)]
    struct Full {
        #[serde(default)]
        page: u32,
        #[serde(skip)]
        user: Id,
        #[serde(skip)]
        id: Id,
        #[serde(skip)]
        body: Option<Body>,
        #[serde(skip)]
        request: Option<Arc<ApiRequest>>,
        #[serde(skip)]
        conf: i64,
    }

    impl InputShape for Full {
        fn describe(slots: &mut SlotMap<Self>) {
            slots
                .anonymous_user_id(|s| &mut s.user)
                .resource_id(|s| &mut s.id)
                .content(|s| &mut s.body)
                .raw_request(|s| &mut s.request)
                .config_version(|s| &mut s.conf);
        }
    }

    #[derive(Deserialize)]
    struct Plain {
        #[allow(dead_code)]
        q: Option<String>,
    }

    impl InputShape for Plain {}

    #[derive(Deserialize)]
    struct Twice {
        #[serde(skip)]
        a: Id,
        #[serde(skip)]
        b: Id,
    }

    impl InputShape for Twice {
        fn describe(slots: &mut SlotMap<Self>) {
            slots.resource_id(|s| &mut s.a).resource_id(|s| &mut s.b);
        }
    }

    #[derive(Deserialize)]
    struct Both {
        #[serde(skip)]
        user: Id,
        #[serde(skip)]
        admin: Id,
    }

    impl InputShape for Both {
        fn describe(slots: &mut SlotMap<Self>) {
            slots.user_id(|s| &mut s.user).admin_id(|s| &mut s.admin);
        }
    }

    #[derive(Deserialize)]
    struct Admin {
        #[serde(skip)]
        admin: Id,
    }

    impl InputShape for Admin {
        fn describe(slots: &mut SlotMap<Self>) {
            slots.admin_id(|s| &mut s.admin);
        }
    }

    fn blank() -> Full {
        serde_json::from_str("{}").unwrap()
    }

    #[test]
    fn test_descriptor_flags() {
        let shape = SlotMap::<Full>::collect().unwrap().descriptor();
        assert!(shape.requires_auth);
        assert!(shape.allow_anonymous);
        assert!(!shape.requires_admin);
        assert!(shape.has_resource_id);
        assert!(shape.has_content);
        assert!(shape.has_raw_request);
        assert!(shape.has_config_version);
        assert!(!shape.is_dummy_input);
        assert!(shape.input_type.ends_with("Full"));
        assert!(shape.content_type.unwrap().ends_with("Body"));
    }

    #[test]
    fn test_plain_input_has_no_slots() {
        let shape = SlotMap::<Plain>::collect().unwrap().descriptor();
        assert!(!shape.requires_auth);
        assert!(!shape.has_content);
        assert_eq!(shape.content_type, None);
    }

    #[test]
    fn test_dummy_input_detected() {
        let shape = SlotMap::<DummyInput>::collect().unwrap().descriptor();
        assert!(shape.is_dummy_input);
        assert!(!shape.requires_auth);
    }

    #[test]
    fn test_admin_slot() {
        let shape = SlotMap::<Admin>::collect().unwrap().descriptor();
        assert!(shape.requires_admin);
        assert!(!shape.requires_auth);
    }

    #[test]
    fn test_duplicate_slot_rejected() {
        let err = SlotMap::<Twice>::collect().unwrap_err();
        assert!(matches!(
            err,
            ShapeError::DuplicateSlot {
                slot: SlotKind::ResourceId,
                ..
            }
        ));
    }

    #[test]
    fn test_user_and_admin_rejected() {
        let err = SlotMap::<Both>::collect().unwrap_err();
        assert!(matches!(err, ShapeError::ConflictingIdentitySlots { .. }));
        assert!(err.to_string().contains("keep one"));
    }

    #[test]
    fn test_injection() {
        let slots = SlotMap::<Full>::collect().unwrap();
        let mut input = blank();

        slots.inject_user_id(&mut input, 11);
        slots.inject_admin_id(&mut input, 99);
        slots.inject_resource_id(&mut input, 42);
        slots.inject_config_version(&mut input, -3);
        slots
            .inject_content(&mut input, br#"{"title":"hello"}"#)
            .unwrap();

        assert_eq!(input.user, 11);
        assert_eq!(input.id, 42);
        assert_eq!(input.conf, -3);
        assert_eq!(
            input.body,
            Some(Body {
                title: "hello".into()
            })
        );
        assert_eq!(input.page, 0);
    }

    #[test]
    fn test_content_decode_failure() {
        let slots = SlotMap::<Full>::collect().unwrap();
        let mut input = blank();
        assert!(slots.inject_content(&mut input, b"{not json").is_err());
        assert!(input.body.is_none());
    }

    #[test]
    fn test_raw_request_injection() {
        let slots = SlotMap::<Full>::collect().unwrap();
        let mut input = blank();
        let request = Arc::new(ApiRequest::from(
            http::Request::builder()
                .uri("/x")
                .body(Bytes::new())
                .unwrap(),
        ));
        slots.inject_raw_request(&mut input, Arc::clone(&request));
        assert_eq!(input.request.unwrap().id(), request.id());
    }

    #[test]
    fn test_undeclared_slots_are_ignored() {
        let slots = SlotMap::<Plain>::collect().unwrap();
        let mut input: Plain = serde_json::from_str("{}").unwrap();
        slots.inject_user_id(&mut input, 1);
        assert!(slots.inject_content(&mut input, b"garbage").is_ok());
    }
}
