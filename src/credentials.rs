use std::sync::{Arc, RwLock};

/// Source of the bearer token attached to outgoing requests.
///
/// Called once per request; `None` (or an empty token) means the
/// `Authorization` header is omitted.
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// Provider for anonymous clients.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn token(&self) -> Option<String> {
        None
    }
}

/// Shared, externally managed token cell.
///
/// Login/refresh flows own the writes; clients only read.
#[derive(Clone, Debug, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    pub fn set(&self, token: impl Into<String>) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(token.into());
    }

    pub fn clear(&self) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

impl CredentialProvider for TokenStore {
    fn token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Bearer header value for the provider's current token, if it has a usable one.
pub(crate) fn bearer_value(provider: &dyn CredentialProvider) -> Option<String> {
    provider
        .token()
        .filter(|token| !token.trim().is_empty())
        .map(|token| format!("Bearer {token}"))
}
