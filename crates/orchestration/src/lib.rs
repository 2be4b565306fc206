//! Fulfillment lifecycle orchestration.
//!
//! Two ingestion paths keep request state consistent with the vendors:
//! provider webhooks and a polling reconciler. Both converge on
//! [`WebhookRouter::process_event`], which is idempotent through
//! storage-level event dedup. Order-level status is re-derived from the
//! full request set on every event, and the cancellation and retry
//! orchestrators act on the current state with per-request failure
//! isolation.

mod aggregator;
mod cancellation;
mod error;
mod poller;
mod queue;
mod retry;
mod router;
mod submission;

pub use aggregator::{OrderAggregator, aggregate};
pub use cancellation::{CancellationOrchestrator, CancellationOutcome, FailedCancellation};
pub use error::{OrchestrationError, Result};
pub use poller::{PollSummary, PollerConfig, PollingReconciler};
pub use queue::{InMemoryMessageSink, MessageSink, RetryMessage};
pub use retry::{RetryOrchestrator, RetryOutcome};
pub use router::{ProcessOutcome, WebhookRouter};
pub use submission::SubmissionService;
