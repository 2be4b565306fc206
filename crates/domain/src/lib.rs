//! Domain layer for the fulfillment orchestration platform.
//!
//! Contains the fulfillment request lifecycle state machine, the provider
//! variant set, and the persistent/inbound record types shared by the
//! store and orchestration layers. Everything in this crate is pure data
//! and pure logic; no I/O.

mod error;
mod event;
mod order;
mod order_status;
mod provider;
mod request;
mod shipment;
mod status;

pub use error::DomainError;
pub use event::{InboundEvent, ProviderEvent, ShipmentData};
pub use order::OrderRecord;
pub use order_status::OrderStatus;
pub use provider::Provider;
pub use request::{FulfillmentRequest, FulfillmentRequestItem};
pub use shipment::Shipment;
pub use status::FulfillmentStatus;
