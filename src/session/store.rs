use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

/// Error type shared by all token store implementations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// The two slots a token store manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    /// Storage key name for this slot.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "accessToken",
            Self::Refresh => "refreshToken",
        }
    }
}

/// Persistent storage for the session's token pair.
///
/// Contract: after `persist(key, value)`, `retrieve(key)` returns that value
/// until `delete(key)` runs; `delete` is idempotent.
pub trait TokenStore: Send + Sync + 'static {
    fn persist(
        &self,
        key: TokenKey,
        value: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn retrieve(
        &self,
        key: TokenKey,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn delete(&self, key: TokenKey) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// OS-keychain-backed store for native shells.
///
/// One `keyring` entry per token under the given service name.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: TokenKey) -> Result<keyring::Entry, StoreError> {
        keyring::Entry::new(&self.service, key.as_str()).map_err(Into::into)
    }
}

impl TokenStore for KeyringStore {
    fn persist(
        &self,
        key: TokenKey,
        value: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let entry = self.entry(key);
        async move { entry?.set_password(&value).map_err(Into::into) }
    }

    fn retrieve(
        &self,
        key: TokenKey,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        let entry = self.entry(key);
        async move {
            match entry?.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(e.into()),
            }
        }
    }

    fn delete(&self, key: TokenKey) -> impl Future<Output = Result<(), StoreError>> + Send {
        let entry = self.entry(key);
        async move {
            match entry?.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
    }
}

/// Store used by web shells, where the real tokens live in HTTP-only
/// cookies the client cannot read. Persists nothing; session presence is
/// observed through the session-check endpoint instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStore;

impl TokenStore for BrowserStore {
    fn persist(
        &self,
        _key: TokenKey,
        _value: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        async { Ok(()) }
    }

    fn retrieve(
        &self,
        _key: TokenKey,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        async { Ok(None) }
    }

    fn delete(&self, _key: TokenKey) -> impl Future<Output = Result<(), StoreError>> + Send {
        async { Ok(()) }
    }
}

/// In-memory store for tests and ephemeral shells.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<TokenKey, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryStore {
    fn persist(
        &self,
        key: TokenKey,
        value: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.values
            .lock()
            .expect("store lock poisoned")
            .insert(key, value);
        async { Ok(()) }
    }

    fn retrieve(
        &self,
        key: TokenKey,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        let value = self
            .values
            .lock()
            .expect("store lock poisoned")
            .get(&key)
            .cloned();
        async move { Ok(value) }
    }

    fn delete(&self, key: TokenKey) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.values.lock().expect("store lock poisoned").remove(&key);
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_honors_the_contract() {
        let store = MemoryStore::new();
        store
            .persist(TokenKey::Access, "tok".into())
            .await
            .unwrap();
        assert_eq!(
            store.retrieve(TokenKey::Access).await.unwrap().as_deref(),
            Some("tok")
        );
        assert_eq!(store.retrieve(TokenKey::Refresh).await.unwrap(), None);

        store.delete(TokenKey::Access).await.unwrap();
        assert_eq!(store.retrieve(TokenKey::Access).await.unwrap(), None);
        // Idempotent.
        store.delete(TokenKey::Access).await.unwrap();
    }

    #[tokio::test]
    async fn browser_store_is_a_no_op() {
        let store = BrowserStore;
        store
            .persist(TokenKey::Access, "tok".into())
            .await
            .unwrap();
        assert_eq!(store.retrieve(TokenKey::Access).await.unwrap(), None);
        store.delete(TokenKey::Access).await.unwrap();
    }

    #[test]
    fn key_names_match_the_storage_schema() {
        assert_eq!(TokenKey::Access.as_str(), "accessToken");
        assert_eq!(TokenKey::Refresh.as_str(), "refreshToken");
    }
}
