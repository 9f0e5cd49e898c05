//! # Heron Core
//!
//! Core types shared by the Heron dispatch engine.
//!
//! - [`ApiError`] / [`ErrCode`] - the business error envelope
//! - [`HandlerError`] - what business handlers return on failure
//! - [`Identity`], [`Role`], [`Id`] - the result of authentication
//! - [`ApiRequest`] - the incoming request, body collected
//! - [`InputShape`] / [`SlotMap`] - reserved-slot declarations for handler inputs
//! - [`Signature`], [`Page`], [`Reply`] - the closed set of handler results

#![doc(html_root_url = "https://docs.rs/heron-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod handler;
mod identity;
mod request;
pub mod shape;

pub use error::{
    forbidden_err, internal_err, not_found_err, unauthorized_err, ApiError, ErrCode,
    HandlerError, HandlerResult, UnknownErrCode, GENERIC_INTERNAL_MESSAGE,
};
pub use handler::{Page, Reply, Signature};
pub use identity::{Id, Identity, Role, ANONYMOUS_ID};
pub use request::{ApiRequest, Params, RequestId};
pub use shape::{DummyInput, InputShape, ShapeDescriptor, ShapeError, SlotKind, SlotMap};
