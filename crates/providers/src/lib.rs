//! Provider adapters for the external print/ship vendors.
//!
//! Every vendor is reached through the same [`ProviderClient`] capability
//! trait; the vendor-specific clients translate between their HTTP APIs
//! and the canonical fulfillment vocabulary. Clients are constructed per
//! call from a resolved credential and hold no long-lived state beyond a
//! connection pool.

mod client;
mod credentials;
mod error;
mod factory;
mod gooten;
mod mock;
mod printful;
mod prodigi;
mod shapeways;
pub mod webhook;

pub use client::{OrderSubmission, ProviderClient, ProviderOrder, Recipient, SubmissionItem};
pub use credentials::{Credential, CredentialResolver, LayeredCredentialResolver};
pub use error::ProviderError;
pub use factory::{ClientFactory, HttpClientFactory};
pub use gooten::GootenClient;
pub use mock::{MockClientFactory, MockProviderClient};
pub use printful::PrintfulClient;
pub use prodigi::ProdigiClient;
pub use shapeways::ShapewaysClient;
