// ABOUTME: Credential store for the access token, refresh token, and session id over a KeyValueStore.
// ABOUTME: Reads are failure-tolerant; writes only touch the non-empty fields supplied.

use std::sync::Arc;

use tracing::warn;

use crate::storage::{KeyValueStore, MemoryStore};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const SID_KEY: &str = "session_id";

/// Handle to the persisted credential triple. Cheap to clone.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    /// A store that forgets everything when the process exits.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// The underlying key/value store, shared with other persisted client state.
    pub fn backing(&self) -> Arc<dyn KeyValueStore> {
        self.inner.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    pub fn sid(&self) -> Option<String> {
        self.read(SID_KEY)
    }

    /// Store whichever of the three values are present and non-empty.
    /// `None` or `""` leaves the stored value untouched.
    pub fn set_tokens(&self, access: Option<&str>, refresh: Option<&str>, sid: Option<&str>) {
        self.write(ACCESS_TOKEN_KEY, access);
        self.write(REFRESH_TOKEN_KEY, refresh);
        self.write(SID_KEY, sid);
    }

    pub fn set_sid(&self, sid: &str) {
        self.write(SID_KEY, Some(sid));
    }

    pub fn clear_tokens(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SID_KEY] {
            if let Err(e) = self.inner.remove(key) {
                warn!("failed to clear {}: {}", key, e);
            }
        }
    }

    /// Presence check only; says nothing about expiry.
    pub fn has_valid_token(&self) -> bool {
        self.access_token().is_some()
    }

    fn read(&self, key: &str) -> Option<String> {
        self.inner.get(key).filter(|v| !v.is_empty())
    }

    fn write(&self, key: &str, value: Option<&str>) {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return;
        };
        if let Err(e) = self.inner.set(key, value) {
            warn!("failed to store {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_tokens_empties_every_getter() {
        let store = CredentialStore::in_memory();
        store.set_tokens(Some("access"), Some("refresh"), Some("sid"));
        assert!(store.has_valid_token());

        store.clear_tokens();
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert_eq!(store.sid(), None);
        assert!(!store.has_valid_token());
    }

    #[test]
    fn set_tokens_skips_missing_fields() {
        let store = CredentialStore::in_memory();
        store.set_tokens(Some("a1"), Some("r1"), Some("s1"));
        store.set_tokens(Some("a2"), None, Some("s2"));

        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
        assert_eq!(store.sid().as_deref(), Some("s2"));
    }

    #[test]
    fn set_tokens_skips_empty_strings() {
        let store = CredentialStore::in_memory();
        store.set_tokens(Some("a1"), Some("r1"), None);
        store.set_tokens(Some(""), Some(""), Some(""));

        assert_eq!(store.access_token().as_deref(), Some("a1"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
        assert_eq!(store.sid(), None);
    }

    #[test]
    fn has_valid_token_is_presence_only() {
        let store = CredentialStore::in_memory();
        assert!(!store.has_valid_token());
        store.set_tokens(Some("not-even-a-jwt"), None, None);
        assert!(store.has_valid_token());
    }

    #[test]
    fn backing_store_is_shared() {
        let store = CredentialStore::in_memory();
        store.set_sid("abc");
        assert_eq!(store.backing().get(SID_KEY).as_deref(), Some("abc"));
    }
}
