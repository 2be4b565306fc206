//! Polling reconciler for providers without webhooks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::{FulfillmentStatus, InboundEvent, Provider, ShipmentData};
use providers::{ClientFactory, CredentialResolver};
use store::{FulfillmentStore, OrderRepository};

use crate::error::Result;
use crate::router::WebhookRouter;

/// Tuning for one reconciler instance.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub provider: Provider,
    /// Hard ceiling on vendor calls per run; the remainder waits for the
    /// next cycle.
    pub max_calls_per_run: usize,
    /// Pause between consecutive vendor calls.
    pub call_delay: Duration,
}

impl PollerConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            max_calls_per_run: 100,
            call_delay: Duration::from_millis(250),
        }
    }
}

/// What one reconciliation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Vendor calls made.
    pub polled: usize,
    /// Requests whose vendor status differed from ours.
    pub changed: usize,
    /// The call ceiling cut the run short.
    pub truncated: bool,
}

/// Drives status convergence for a provider by asking the vendor.
///
/// Differences are not applied directly; the reconciler synthesizes an
/// inbound event and feeds it through the same router as webhooks, so
/// both paths share one transition gate and one dedup ledger. The
/// synthetic event id embeds the poll timestamp, which also rate-limits
/// duplicate work to one applied event per request per second.
pub struct PollingReconciler<S, O> {
    store: S,
    router: WebhookRouter<S, O>,
    resolver: Arc<dyn CredentialResolver>,
    clients: Arc<dyn ClientFactory>,
    config: PollerConfig,
}

impl<S, O> PollingReconciler<S, O>
where
    S: FulfillmentStore + Clone,
    O: OrderRepository,
{
    pub fn new(
        store: S,
        router: WebhookRouter<S, O>,
        resolver: Arc<dyn CredentialResolver>,
        clients: Arc<dyn ClientFactory>,
        config: PollerConfig,
    ) -> Self {
        Self {
            store,
            router,
            resolver,
            clients,
            config,
        }
    }

    /// One reconciliation sweep over the provider's active requests.
    #[tracing::instrument(skip(self), fields(provider = %self.config.provider))]
    pub async fn run_once(&self) -> Result<PollSummary> {
        let active = self
            .store
            .list_active_for_provider(self.config.provider)
            .await?;

        let mut summary = PollSummary::default();

        for request in active {
            // Nothing to ask the vendor about until submission assigned
            // an external id.
            let Some(external_id) = request.external_id.clone() else {
                continue;
            };

            if summary.polled >= self.config.max_calls_per_run {
                summary.truncated = true;
                tracing::info!(
                    max_calls = self.config.max_calls_per_run,
                    "poll ceiling reached, deferring remainder to next run"
                );
                break;
            }

            let Some(credential) = self
                .resolver
                .resolve(request.provider, Some(request.store_id))
            else {
                tracing::warn!(request_id = %request.id, "no credential, skipping poll");
                continue;
            };

            if summary.polled > 0 {
                tokio::time::sleep(self.config.call_delay).await;
            }

            let client = self.clients.client_for(request.provider, &credential);
            summary.polled += 1;
            metrics::counter!("provider_polls_total").increment(1);

            let order = match client.get_order(&external_id).await {
                Ok(order) => order,
                Err(err) => {
                    tracing::warn!(request_id = %request.id, error = %err, "poll failed, will retry next run");
                    continue;
                }
            };

            // An unrecognized or unchanged vendor status is a no-op; no
            // event is synthesized.
            let Some(status) = order.status else {
                continue;
            };
            if status == request.status {
                continue;
            }

            summary.changed += 1;
            let shipment = match (status, order.tracking_number) {
                (FulfillmentStatus::Shipped, Some(tracking_number)) => Some(ShipmentData {
                    carrier: String::new(),
                    tracking_number,
                    tracking_url: order.tracking_url,
                    shipped_at: Some(Utc::now()),
                    raw: None,
                }),
                _ => None,
            };

            let event = InboundEvent {
                provider: request.provider,
                external_event_id: Some(format!(
                    "poll:{external_id}:{}",
                    Utc::now().timestamp()
                )),
                external_order_id: external_id,
                event_type: "poll.status_changed".to_string(),
                payload: serde_json::json!({
                    "source": "poll",
                    "status": status.as_str(),
                }),
                mapped_status: Some(status),
                shipment,
            };

            self.router.process_event(event).await?;
        }

        tracing::debug!(
            polled = summary.polled,
            changed = summary.changed,
            truncated = summary.truncated,
            "poll run complete"
        );
        Ok(summary)
    }

    /// Runs sweeps forever at `interval`. Intended for `tokio::spawn`.
    pub async fn run(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = self.run_once().await {
                tracing::error!(error = %err, "poll run failed");
            }
        }
    }
}
