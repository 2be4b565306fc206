//! Persistence layer for the fulfillment core.
//!
//! Exposes the [`FulfillmentStore`] trait with in-memory and PostgreSQL
//! implementations, plus the [`OrderRepository`] collaborator trait used
//! for cancellation preconditions and order aggregation writes.
//!
//! The store is where the two hard invariants live: the status machine
//! gates every `update_status`, and `(provider, external_event_id)`
//! uniqueness on insert is the only synchronization primitive between
//! the concurrent ingestion paths.

mod error;
mod memory;
mod orders;
mod postgres;
mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryFulfillmentStore;
pub use orders::{InMemoryOrderRepository, OrderRepository};
pub use postgres::PostgresFulfillmentStore;
pub use store::{
    FulfillmentStore, NewFulfillmentRequest, NewProviderEvent, NewRequestItem, NewShipment,
    StatusUpdate,
};
