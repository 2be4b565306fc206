//! Mock provider client for orchestration tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{FulfillmentStatus, Provider};

use crate::client::{OrderSubmission, ProviderClient, ProviderOrder};
use crate::credentials::Credential;
use crate::error::ProviderError;
use crate::factory::ClientFactory;

#[derive(Debug, Default)]
struct MockState {
    submitted: Vec<String>,
    cancelled: Vec<String>,
    orders: HashMap<String, ProviderOrder>,
    fail_on_submit: bool,
    fail_on_cancel: bool,
    get_order_calls: usize,
}

/// In-memory provider client with scriptable failures and canned
/// `get_order` responses.
#[derive(Debug, Clone)]
pub struct MockProviderClient {
    provider: Provider,
    state: Arc<RwLock<MockState>>,
}

impl MockProviderClient {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            state: Arc::new(RwLock::new(MockState::default())),
        }
    }

    /// Configures the client to fail submit calls.
    pub fn set_fail_on_submit(&self, fail: bool) {
        self.state.write().unwrap().fail_on_submit = fail;
    }

    /// Configures the client to fail cancel calls.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    /// Sets the canned `get_order` response for an external id.
    pub fn set_order(
        &self,
        external_id: impl Into<String>,
        status: Option<FulfillmentStatus>,
        tracking_number: Option<&str>,
    ) {
        self.state.write().unwrap().orders.insert(
            external_id.into(),
            ProviderOrder {
                status,
                tracking_number: tracking_number.map(String::from),
                tracking_url: None,
            },
        );
    }

    /// External ids of orders cancelled through this client.
    pub fn cancelled_ids(&self) -> Vec<String> {
        self.state.read().unwrap().cancelled.clone()
    }

    /// Number of orders submitted through this client.
    pub fn submitted_count(&self) -> usize {
        self.state.read().unwrap().submitted.len()
    }

    /// Number of `get_order` calls made through this client.
    pub fn get_order_calls(&self) -> usize {
        self.state.read().unwrap().get_order_calls
    }

    fn api_error(&self, message: &str) -> ProviderError {
        ProviderError::Api {
            provider: self.provider,
            status: 500,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ProviderClient for MockProviderClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn submit_order(&self, submission: &OrderSubmission) -> Result<String, ProviderError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_submit {
            return Err(self.api_error("submission rejected"));
        }
        state.submitted.push(submission.reference.clone());
        let external_id = format!("{}-{:04}", self.provider, state.submitted.len());
        Ok(external_id)
    }

    async fn cancel_order(&self, external_id: &str) -> Result<(), ProviderError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_cancel {
            return Err(self.api_error("cancellation rejected"));
        }
        state.cancelled.push(external_id.to_string());
        Ok(())
    }

    async fn get_order(&self, external_id: &str) -> Result<ProviderOrder, ProviderError> {
        let mut state = self.state.write().unwrap();
        state.get_order_calls += 1;
        Ok(state.orders.get(external_id).cloned().unwrap_or_default())
    }
}

/// Factory handing out one shared mock client per provider, so tests can
/// script and inspect the same instance the orchestrators use.
#[derive(Debug, Clone)]
pub struct MockClientFactory {
    clients: HashMap<Provider, MockProviderClient>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        let clients = Provider::ALL
            .into_iter()
            .map(|provider| (provider, MockProviderClient::new(provider)))
            .collect();
        Self { clients }
    }

    /// The shared mock client for a provider.
    pub fn client(&self, provider: Provider) -> &MockProviderClient {
        &self.clients[&provider]
    }
}

impl Default for MockClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientFactory for MockClientFactory {
    fn client_for(&self, provider: Provider, _credential: &Credential) -> Arc<dyn ProviderClient> {
        Arc::new(self.clients[&provider].clone())
    }
}
