//! Handler binding.
//!
//! A [`Handler`] wraps a business function of one input parameter. The
//! constructor fixes the result shape:
//!
//! | Constructor | Function returns | Reply |
//! |-------------|------------------|-------|
//! | [`Handler::empty`] | `HandlerResult<()>` | `{}` |
//! | [`Handler::data`] | `HandlerResult<R: Serialize>` | `R` as JSON |
//! | [`Handler::page`] | `HandlerResult<Page<R>>` | rendered template |
//!
//! The input type's [`InputShape`] declaration is collected when the
//! handler is created. [`bind`] turns it into a [`MethodBinding`] or a
//! [`RegistrationError`].
//!
//! Once bound, the input type is erased. The binding keeps a
//! [`SlotMap`] for its input type and fills a fresh input per request:
//! query fields first, then identity, resource id, content, raw request
//! and config version, in that order.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use heron_config::DispatchConfig;
use heron_core::{
    ApiError, ApiRequest, HandlerError, HandlerResult, InputShape, Page, Reply, ShapeDescriptor,
    ShapeError, Signature, SlotMap, ANONYMOUS_ID,
};
use heron_extract::{
    config_version, decode_query, json_body, FromRequest, Query, ResourceId, RESOURCE_ID_PARAM,
};
use serde::Serialize;

use crate::auth::Authenticator;
use crate::descriptor::MethodKey;
use crate::error::RegistrationError;

/// Boxed future returned by erased handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type CallFuture = BoxFuture<'static, HandlerResult<Reply>>;

type ErasedCall<I> = Box<dyn Fn(I) -> CallFuture + Send + Sync>;

pub(crate) const UNAUTHORIZED_MSG: &str =
    "either remove the user id slot from your input, or allow anonymous access";
pub(crate) const ADMIN_REQUIRED_MSG: &str =
    "admin role required, you could remove the admin id slot from your input";

fn resource_id_msg(raw: &str) -> String {
    format!(
        "ResourceId ('{raw}' in url) required, you could remove the resource id slot from your input"
    )
}

/// Why a bound call did not produce a reply.
#[derive(Debug)]
pub(crate) enum CallFailure {
    /// Rejected while filling the input; the handler never ran.
    Rejected(ApiError),
    /// The handler ran and returned an error.
    Handler(HandlerError),
}

/// Request-scoped collaborators for one call.
pub(crate) struct Invocation<'a> {
    pub request: &'a Arc<ApiRequest>,
    pub authenticator: Option<&'a Authenticator>,
    pub config: &'a DispatchConfig,
}

/// A bound handler with its input type erased.
pub(crate) trait Invoke: Send + Sync {
    fn invoke<'a>(&'a self, cx: Invocation<'a>) -> BoxFuture<'a, Result<Reply, CallFailure>>;
}

struct TypedCallable<I> {
    slots: SlotMap<I>,
    shape: ShapeDescriptor,
    call: ErasedCall<I>,
}

impl<I: InputShape> TypedCallable<I> {
    fn build_input(&self, req: &ApiRequest) -> Result<I, ApiError> {
        if self.shape.is_dummy_input {
            return decode_query::<I>("").map_err(ApiError::from);
        }
        Query::<I>::from_request(req)
            .map(Query::into_inner)
            .map_err(ApiError::from)
    }

    async fn bind_slots(&self, input: &mut I, cx: &Invocation<'_>) -> Result<(), ApiError> {
        let req = cx.request.as_ref();

        if self.shape.requires_auth {
            let identity = authenticate(cx, req).await;
            if identity.is_authenticated() {
                self.slots.inject_user_id(input, identity.user);
            } else if self.shape.allow_anonymous {
                self.slots.inject_user_id(input, ANONYMOUS_ID);
            } else {
                return Err(ApiError::unauthorized(UNAUTHORIZED_MSG));
            }
        }

        if self.shape.requires_admin {
            let identity = authenticate(cx, req).await;
            if !identity.is_web_admin() {
                return Err(ApiError::unauthorized(ADMIN_REQUIRED_MSG));
            }
            self.slots.inject_admin_id(input, identity.user);
        }

        if self.shape.has_resource_id {
            let ResourceId(id) = ResourceId::from_request(req).map_err(|_| {
                let raw = req.param(RESOURCE_ID_PARAM).unwrap_or("");
                ApiError::not_found(resource_id_msg(raw))
            })?;
            self.slots.inject_resource_id(input, id);
        }

        if self.shape.has_content {
            let body = json_body(req, cx.config.max_body_bytes).map_err(ApiError::from)?;
            self.slots
                .inject_content(input, body)
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
        }

        if self.shape.has_raw_request {
            self.slots.inject_raw_request(input, Arc::clone(cx.request));
        }

        if self.shape.has_config_version {
            let version = config_version(req, &cx.config.config_version_header);
            self.slots.inject_config_version(input, version);
        }

        Ok(())
    }
}

async fn authenticate(cx: &Invocation<'_>, req: &ApiRequest) -> heron_core::Identity {
    match cx.authenticator {
        Some(auth) => auth.authenticate(req).await,
        None => heron_core::Identity::NONE,
    }
}

impl<I: InputShape> Invoke for TypedCallable<I> {
    fn invoke<'a>(&'a self, cx: Invocation<'a>) -> BoxFuture<'a, Result<Reply, CallFailure>> {
        Box::pin(async move {
            let mut input = self
                .build_input(cx.request)
                .map_err(CallFailure::Rejected)?;
            self.bind_slots(&mut input, &cx)
                .await
                .map_err(CallFailure::Rejected)?;
            (self.call)(input).await.map_err(CallFailure::Handler)
        })
    }
}

struct Bound {
    shape: ShapeDescriptor,
    callable: Arc<dyn Invoke>,
}

/// A business function ready to be bound to a method key.
///
/// # Example
///
/// ```rust
/// use heron_core::{HandlerResult, Id, InputShape, SlotMap};
/// use heron_dispatch::Handler;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize)]
/// struct ListPosts {
///     #[serde(default)]
///     page: u32,
///     #[serde(skip)]
///     user_id: Id,
/// }
///
/// impl InputShape for ListPosts {
///     fn describe(slots: &mut SlotMap<Self>) {
///         slots.user_id(|i| &mut i.user_id);
///     }
/// }
///
/// #[derive(Serialize)]
/// struct Posts {
///     page: u32,
///     owner: Id,
/// }
///
/// let handler = Handler::data(|input: ListPosts| async move {
///     HandlerResult::Ok(Posts { page: input.page, owner: input.user_id })
/// });
/// assert_eq!(handler.signature(), heron_core::Signature::DataAndError);
/// ```
pub struct Handler {
    signature: Signature,
    bound: Result<Bound, ShapeError>,
}

impl Handler {
    /// A handler that only reports success or failure.
    pub fn empty<I, F, Fut>(f: F) -> Self
    where
        I: InputShape,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        Self::typed(Signature::ErrorOnly, move |input: I| -> CallFuture {
            let fut = f(input);
            Box::pin(async move { fut.await.map(|()| Reply::Empty) })
        })
    }

    /// A handler returning a serializable value.
    pub fn data<I, R, F, Fut>(f: F) -> Self
    where
        I: InputShape,
        R: Serialize + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static,
    {
        Self::typed(Signature::DataAndError, move |input: I| -> CallFuture {
            let fut = f(input);
            Box::pin(async move { Reply::data(fut.await?).map_err(HandlerError::from) })
        })
    }

    /// A handler returning a page for a document descriptor.
    pub fn page<I, R, F, Fut>(f: F) -> Self
    where
        I: InputShape,
        R: Serialize + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Page<R>>> + Send + 'static,
    {
        Self::typed(
            Signature::DataTemplateAndError,
            move |input: I| -> CallFuture {
                let fut = f(input);
                Box::pin(async move { fut.await?.into_reply().map_err(HandlerError::from) })
            },
        )
    }

    fn typed<I, C>(signature: Signature, call: C) -> Self
    where
        I: InputShape,
        C: Fn(I) -> CallFuture + Send + Sync + 'static,
    {
        let bound = SlotMap::<I>::collect().map(|slots| {
            let shape = slots.descriptor();
            Bound {
                shape: shape.clone(),
                callable: Arc::new(TypedCallable {
                    slots,
                    shape,
                    call: Box::new(call),
                }),
            }
        });
        Self { signature, bound }
    }

    /// The result shape fixed by the constructor.
    #[must_use]
    pub const fn signature(&self) -> Signature {
        self.signature
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Handler");
        s.field("signature", &self.signature);
        match &self.bound {
            Ok(bound) => s.field("input", &bound.shape.input_type),
            Err(err) => s.field("error", err),
        };
        s.finish()
    }
}

/// A handler bound to one method key.
#[derive(Clone)]
pub struct MethodBinding {
    key: MethodKey,
    signature: Signature,
    shape: ShapeDescriptor,
    callable: Arc<dyn Invoke>,
}

impl MethodBinding {
    /// The key this binding answers.
    #[must_use]
    pub const fn key(&self) -> MethodKey {
        self.key
    }

    /// The handler's result shape.
    #[must_use]
    pub const fn signature(&self) -> Signature {
        self.signature
    }

    /// What the handler's input declares.
    #[must_use]
    pub const fn shape(&self) -> &ShapeDescriptor {
        &self.shape
    }

    pub(crate) async fn call(&self, cx: Invocation<'_>) -> Result<Reply, CallFailure> {
        self.callable.invoke(cx).await
    }
}

impl fmt::Debug for MethodBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBinding")
            .field("key", &self.key)
            .field("signature", &self.signature)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// Binds `handler` under `key` for the descriptor at `path`.
///
/// # Errors
///
/// Returns [`RegistrationError::Shape`] if the handler's input type
/// declares its slots wrongly.
pub fn bind(path: &str, key: MethodKey, handler: Handler) -> Result<MethodBinding, RegistrationError> {
    let bound = handler.bound.map_err(|source| RegistrationError::Shape {
        path: path.to_string(),
        key: key.to_string(),
        source,
    })?;

    Ok(MethodBinding {
        key,
        signature: handler.signature,
        shape: bound.shape,
        callable: bound.callable,
    })
}
