//! # Heron Test
//!
//! In-memory testing for Heron dispatchers. Requests go through the full
//! pipeline (authentication, slot binding, rendering, metrics) without a
//! server or a socket.
//!
//! - [`TestClient`] - sends requests to a [`Dispatcher`](heron_dispatch::Dispatcher)
//! - [`TestRequest`] - builds an [`ApiRequest`](heron_core::ApiRequest)
//! - [`TestResponse`] - envelope-aware assertions
//! - [`TestAuth`] - an in-memory token decoder and store
//!
//! ## Example
//!
//! ```ignore
//! use heron_core::{Identity, Role};
//! use heron_test::{TestAuth, TestClient};
//!
//! #[tokio::test]
//! async fn test_show_post() {
//!     let auth = TestAuth::new();
//!     auth.issue("alice", Identity::new(7, Role::APP_USER));
//!
//!     let client = TestClient::new(
//!         Dispatcher::builder(registry()).authenticator(auth.authenticator()).build(),
//!     );
//!
//!     client
//!         .get("/posts/3")
//!         .token("alice")
//!         .version(2)
//!         .send()
//!         .await
//!         .assert_json_field("id", &json!(3));
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/heron-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod auth;
mod client;
mod error;
mod request;
mod response;

pub use auth::{MemoryTokenStore, StaticTokenDecoder, TestAuth};
pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
