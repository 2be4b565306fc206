//! Canonical order-level status.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of a customer order as a whole.
///
/// The order aggregate itself is owned outside this core; fulfillment
/// orchestration only reads it for cancellation preconditions and writes
/// it through order aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed but not yet paid.
    #[default]
    Pending,

    /// Payment captured; fulfillment requests exist.
    Paid,

    /// At least one fulfillment request is still in flight.
    Processing,

    /// Every request has shipped (or already been delivered).
    Shipped,

    /// Every request has been delivered.
    Delivered,

    /// Every request was cancelled.
    Cancelled,

    /// Payment was returned to the customer.
    Refunded,
}

impl OrderStatus {
    /// Returns the status name as a snake_case string.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Returns true if an order in this status may no longer be cancelled.
    pub fn forbids_cancellation(self) -> bool {
        matches!(
            self,
            OrderStatus::Cancelled | OrderStatus::Refunded | OrderStatus::Delivered
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use OrderStatus::*;
        [Pending, Paid, Processing, Shipped, Delivered, Cancelled, Refunded]
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_forbidden_states() {
        assert!(OrderStatus::Cancelled.forbids_cancellation());
        assert!(OrderStatus::Refunded.forbids_cancellation());
        assert!(OrderStatus::Delivered.forbids_cancellation());
        assert!(!OrderStatus::Processing.forbids_cancellation());
        assert!(!OrderStatus::Paid.forbids_cancellation());
        assert!(!OrderStatus::Shipped.forbids_cancellation());
    }

    #[test]
    fn string_roundtrip() {
        let parsed: OrderStatus = "refunded".parse().unwrap();
        assert_eq!(parsed, OrderStatus::Refunded);
        assert!("done".parse::<OrderStatus>().is_err());
    }
}
