//! Client construction keyed on the provider identifier.

use std::sync::Arc;

use domain::Provider;

use crate::client::ProviderClient;
use crate::credentials::Credential;
use crate::gooten::GootenClient;
use crate::printful::PrintfulClient;
use crate::prodigi::ProdigiClient;
use crate::shapeways::ShapewaysClient;

/// Builds a client for a provider from a resolved credential.
///
/// Adding a provider means adding a variant arm here, not branching in
/// orchestration code.
pub trait ClientFactory: Send + Sync {
    fn client_for(&self, provider: Provider, credential: &Credential) -> Arc<dyn ProviderClient>;
}

/// The production factory: real HTTP clients against vendor hosts.
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory;

impl HttpClientFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ClientFactory for HttpClientFactory {
    fn client_for(&self, provider: Provider, credential: &Credential) -> Arc<dyn ProviderClient> {
        match provider {
            Provider::Printful => Arc::new(PrintfulClient::new(credential.api_key.clone())),
            Provider::Gooten => Arc::new(GootenClient::new(credential.api_key.clone())),
            Provider::Prodigi => Arc::new(ProdigiClient::new(credential.api_key.clone())),
            Provider::Shapeways => Arc::new(ShapewaysClient::new(credential.api_key.clone())),
        }
    }
}
