//! In-memory token fakes.
//!
//! [`StaticTokenDecoder`] answers the local decode step and
//! [`MemoryTokenStore`] the revocation check. [`TestAuth`] keeps both in
//! step so a test can issue and revoke tokens with one call each.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use heron_core::Identity;
use heron_dispatch::{Authenticator, TokenDecoder, TokenStore};

/// Decodes tokens by looking them up in a fixed table.
///
/// Unknown tokens decode to [`Identity::NONE`].
#[derive(Debug, Default)]
pub struct StaticTokenDecoder {
    tokens: DashMap<String, Identity>,
}

impl StaticTokenDecoder {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `token`, builder style.
    #[must_use]
    pub fn with_token(self, token: impl Into<String>, identity: Identity) -> Self {
        self.insert(token, identity);
        self
    }

    /// Adds or replaces `token`.
    pub fn insert(&self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(token.into(), identity);
    }
}

impl TokenDecoder for StaticTokenDecoder {
    fn decode(&self, token: &str) -> Identity {
        self.tokens
            .get(token)
            .map_or(Identity::NONE, |entry| *entry.value())
    }
}

/// A token store backed by a concurrent set.
///
/// Counts every validation so tests can check the store was or was not
/// consulted.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    live: DashSet<String>,
    lookups: AtomicUsize,
}

impl MemoryTokenStore {
    /// An empty store; every token is rejected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `token` as valid.
    pub fn insert(&self, token: impl Into<String>) {
        self.live.insert(token.into());
    }

    /// Marks `token` as revoked. Returns `true` if it was valid.
    pub fn revoke(&self, token: &str) -> bool {
        self.live.remove(token).is_some()
    }

    /// Number of `validate` calls so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn validate(&self, token: &str) -> bool {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.live.contains(token)
    }
}

/// A decoder and store pair for tests.
#[derive(Debug, Clone, Default)]
pub struct TestAuth {
    decoder: Arc<StaticTokenDecoder>,
    store: Arc<MemoryTokenStore>,
}

impl TestAuth {
    /// No tokens issued yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues `token` for `identity`: decodable and not revoked.
    pub fn issue(&self, token: &str, identity: Identity) -> &Self {
        self.decoder.insert(token, identity);
        self.store.insert(token);
        self
    }

    /// Revokes `token` in the store. It still decodes locally.
    pub fn revoke(&self, token: &str) -> bool {
        self.store.revoke(token)
    }

    /// The store, for inspecting lookups.
    #[must_use]
    pub fn store(&self) -> &MemoryTokenStore {
        &self.store
    }

    /// An authenticator over this pair, reading the default token header.
    #[must_use]
    pub fn authenticator(&self) -> Authenticator {
        Authenticator::new(
            Arc::clone(&self.decoder) as Arc<dyn TokenDecoder>,
            Arc::clone(&self.store) as Arc<dyn TokenStore>,
        )
    }
}
