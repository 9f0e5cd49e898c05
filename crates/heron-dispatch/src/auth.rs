//! Token authentication.
//!
//! A token is decoded locally to an [`Identity`], then confirmed by a
//! [`TokenStore`]. Either step failing yields [`Identity::NONE`]; callers
//! never see why.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use heron_core::{ApiRequest, Identity};
use heron_extract::auth_token;

/// Default header carrying the auth token.
pub const DEFAULT_TOKEN_HEADER: &str = "X-Auth-Token";

/// Decodes a token without any external lookup.
///
/// Malformed tokens decode to a zero user id.
pub trait TokenDecoder: Send + Sync {
    /// Returns the user and role the token claims.
    fn decode(&self, token: &str) -> Identity;
}

/// Confirms that a locally valid token has not been revoked.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns `true` if the token is currently valid.
    async fn validate(&self, token: &str) -> bool;
}

/// Resolves the caller's identity from the token header.
#[derive(Clone)]
pub struct Authenticator {
    decoder: Arc<dyn TokenDecoder>,
    store: Arc<dyn TokenStore>,
    token_header: String,
}

impl Authenticator {
    /// Creates an authenticator reading [`DEFAULT_TOKEN_HEADER`].
    pub fn new(decoder: Arc<dyn TokenDecoder>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            decoder,
            store,
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
        }
    }

    /// Reads the token from `name` instead.
    #[must_use]
    pub fn with_token_header(mut self, name: impl Into<String>) -> Self {
        self.token_header = name.into();
        self
    }

    /// Header the token is read from.
    #[must_use]
    pub fn token_header(&self) -> &str {
        &self.token_header
    }

    /// Identity of the request's caller, or [`Identity::NONE`].
    ///
    /// The store is only asked about tokens that decode to a user.
    pub async fn authenticate(&self, req: &ApiRequest) -> Identity {
        let token = auth_token(req, &self.token_header);
        let identity = self.decoder.decode(token);
        if identity.user == 0 {
            return Identity::NONE;
        }

        if self.store.validate(token).await {
            identity
        } else {
            tracing::debug!(user_id = identity.user, "token rejected by store");
            Identity::NONE
        }
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("token_header", &self.token_header)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use heron_core::Role;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tokens look like `<user>:<role>`.
    struct PairDecoder;

    impl TokenDecoder for PairDecoder {
        fn decode(&self, token: &str) -> Identity {
            let Some((user, role)) = token.split_once(':') else {
                return Identity::NONE;
            };
            match (user.parse(), role.parse()) {
                (Ok(user), Ok(role)) => Identity::new(user, Role::new(role)),
                _ => Identity::NONE,
            }
        }
    }

    #[derive(Default)]
    struct CountingStore {
        accept: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenStore for CountingStore {
        async fn validate(&self, _token: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.accept
        }
    }

    fn request(header: &str, token: Option<&str>) -> ApiRequest {
        let mut builder = http::Request::builder().uri("/me");
        if let Some(token) = token {
            builder = builder.header(header, token);
        }
        ApiRequest::from(builder.body(Bytes::new()).unwrap())
    }

    fn authenticator(store: &Arc<CountingStore>) -> Authenticator {
        Authenticator::new(Arc::new(PairDecoder), Arc::clone(store) as Arc<dyn TokenStore>)
    }

    #[tokio::test]
    async fn test_valid_token() {
        let store = Arc::new(CountingStore {
            accept: true,
            ..CountingStore::default()
        });
        let identity = authenticator(&store)
            .authenticate(&request(DEFAULT_TOKEN_HEADER, Some("42:2")))
            .await;
        assert_eq!(identity, Identity::new(42, Role::WEB_ADMIN));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_undecodable_token_skips_store() {
        let store = Arc::new(CountingStore {
            accept: true,
            ..CountingStore::default()
        });
        let auth = authenticator(&store);

        assert_eq!(
            auth.authenticate(&request(DEFAULT_TOKEN_HEADER, Some("garbage"))).await,
            Identity::NONE
        );
        assert_eq!(
            auth.authenticate(&request(DEFAULT_TOKEN_HEADER, None)).await,
            Identity::NONE
        );
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_revoked_token() {
        let store = Arc::new(CountingStore::default());
        let identity = authenticator(&store)
            .authenticate(&request(DEFAULT_TOKEN_HEADER, Some("7:1")))
            .await;
        assert_eq!(identity, Identity::NONE);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_header() {
        let store = Arc::new(CountingStore {
            accept: true,
            ..CountingStore::default()
        });
        let auth = authenticator(&store).with_token_header("X-Token");
        assert_eq!(auth.token_header(), "X-Token");

        let identity = auth.authenticate(&request("X-Token", Some("9:1"))).await;
        assert_eq!(identity.user, 9);

        let ignored = auth
            .authenticate(&request(DEFAULT_TOKEN_HEADER, Some("9:1")))
            .await;
        assert_eq!(ignored, Identity::NONE);
    }
}
