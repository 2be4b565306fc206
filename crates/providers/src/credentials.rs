//! Credential resolution for vendor API access.

use std::collections::HashMap;

use common::StoreId;
use domain::Provider;

/// An API credential for one vendor account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub api_key: String,
}

impl Credential {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

/// Resolves the credential to use for a provider, optionally scoped to a
/// store.
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self, provider: Provider, store_id: Option<StoreId>) -> Option<Credential>;
}

/// Resolution order: process environment first, then a per-store
/// override, then the platform-global credential.
#[derive(Debug, Clone, Default)]
pub struct LayeredCredentialResolver {
    store_overrides: HashMap<(Provider, StoreId), Credential>,
    global: HashMap<Provider, Credential>,
}

impl LayeredCredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a credential for one store's vendor account.
    pub fn with_store_credential(
        mut self,
        provider: Provider,
        store_id: StoreId,
        credential: Credential,
    ) -> Self {
        self.store_overrides.insert((provider, store_id), credential);
        self
    }

    /// Registers the platform-global credential for a provider.
    pub fn with_global_credential(mut self, provider: Provider, credential: Credential) -> Self {
        self.global.insert(provider, credential);
        self
    }

    fn env_key(provider: Provider) -> String {
        format!("{}_API_KEY", provider.as_str().to_uppercase())
    }
}

impl CredentialResolver for LayeredCredentialResolver {
    fn resolve(&self, provider: Provider, store_id: Option<StoreId>) -> Option<Credential> {
        if let Ok(api_key) = std::env::var(Self::env_key(provider))
            && !api_key.is_empty()
        {
            return Some(Credential::new(api_key));
        }

        if let Some(store_id) = store_id
            && let Some(credential) = self.store_overrides.get(&(provider, store_id))
        {
            return Some(credential.clone());
        }

        self.global.get(&provider).cloned()
    }
}
