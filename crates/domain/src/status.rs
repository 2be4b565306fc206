//! Fulfillment request lifecycle state machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The lifecycle state of a fulfillment request.
///
/// State transitions:
/// ```text
/// Pending ──► Submitted ──► Processing ──► Shipped ──► Delivered
///    │            │              │
///    │            ├──► CancelRequested ──► Cancelled
///    │            │              │    └──► Processing
///    ├────────────┴──► Failed ──► Pending
///    └──► Cancelled
/// ```
///
/// `Delivered` and `Cancelled` are terminal. The transition table in
/// [`can_transition`](FulfillmentStatus::can_transition) is the single
/// source of truth for the lifecycle; every status mutation must be
/// validated against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    /// Created locally, not yet submitted to the provider.
    #[default]
    Pending,

    /// Accepted by the provider; an external id has been assigned.
    Submitted,

    /// The provider is manufacturing the items.
    Processing,

    /// Handed to a carrier; a shipment record exists.
    Shipped,

    /// Confirmed delivered (terminal state).
    Delivered,

    /// A provider-side cancellation was requested but not yet confirmed.
    CancelRequested,

    /// Cancelled locally or confirmed by the provider (terminal state).
    Cancelled,

    /// Submission or production failed; eligible for retry.
    Failed,
}

impl FulfillmentStatus {
    /// All eight states, in declaration order.
    pub const ALL: [FulfillmentStatus; 8] = [
        FulfillmentStatus::Pending,
        FulfillmentStatus::Submitted,
        FulfillmentStatus::Processing,
        FulfillmentStatus::Shipped,
        FulfillmentStatus::Delivered,
        FulfillmentStatus::CancelRequested,
        FulfillmentStatus::Cancelled,
        FulfillmentStatus::Failed,
    ];

    /// Returns true if a transition from `self` to `to` is allowed.
    ///
    /// This is a pure table lookup; callers must reject (not clamp)
    /// transitions for which this returns false.
    pub fn can_transition(self, to: FulfillmentStatus) -> bool {
        use FulfillmentStatus::*;
        match self {
            Pending => matches!(to, Submitted | Failed | Cancelled),
            Submitted => matches!(to, Processing | Failed | CancelRequested | Cancelled),
            Processing => matches!(to, Shipped | Failed | CancelRequested),
            Shipped => matches!(to, Delivered),
            Delivered => false,
            CancelRequested => matches!(to, Cancelled | Processing),
            Cancelled => false,
            Failed => matches!(to, Pending),
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FulfillmentStatus::Delivered | FulfillmentStatus::Cancelled
        )
    }

    /// Returns true if a cancellation may be attempted from this state.
    pub fn can_cancel(self) -> bool {
        matches!(
            self,
            FulfillmentStatus::Pending | FulfillmentStatus::Submitted | FulfillmentStatus::Processing
        )
    }

    /// Returns true if the request may be re-queued for submission.
    pub fn can_retry(self) -> bool {
        matches!(self, FulfillmentStatus::Failed)
    }

    /// Returns the state name as a snake_case string.
    pub fn as_str(self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "pending",
            FulfillmentStatus::Submitted => "submitted",
            FulfillmentStatus::Processing => "processing",
            FulfillmentStatus::Shipped => "shipped",
            FulfillmentStatus::Delivered => "delivered",
            FulfillmentStatus::CancelRequested => "cancel_requested",
            FulfillmentStatus::Cancelled => "cancelled",
            FulfillmentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FulfillmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FulfillmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::FulfillmentStatus::{self, *};

    /// The allowed transitions exactly as designed, `(from, [to...])`.
    const TABLE: [(FulfillmentStatus, &[FulfillmentStatus]); 8] = [
        (Pending, &[Submitted, Failed, Cancelled]),
        (Submitted, &[Processing, Failed, CancelRequested, Cancelled]),
        (Processing, &[Shipped, Failed, CancelRequested]),
        (Shipped, &[Delivered]),
        (Delivered, &[]),
        (CancelRequested, &[Cancelled, Processing]),
        (Cancelled, &[]),
        (Failed, &[Pending]),
    ];

    #[test]
    fn transition_table_matches_exhaustively() {
        // All 64 (from, to) pairs.
        for (from, allowed) in TABLE {
            for to in FulfillmentStatus::ALL {
                assert_eq!(
                    from.can_transition(to),
                    allowed.contains(&to),
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states() {
        for status in FulfillmentStatus::ALL {
            assert_eq!(
                status.is_terminal(),
                matches!(status, Delivered | Cancelled),
                "{status}"
            );
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for status in FulfillmentStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in FulfillmentStatus::ALL {
                assert!(!status.can_transition(to), "{status} -> {to}");
            }
        }
    }

    #[test]
    fn cancellable_states() {
        for status in FulfillmentStatus::ALL {
            assert_eq!(
                status.can_cancel(),
                matches!(status, Pending | Submitted | Processing),
                "{status}"
            );
        }
    }

    #[test]
    fn only_failed_is_retryable() {
        for status in FulfillmentStatus::ALL {
            assert_eq!(status.can_retry(), status == Failed, "{status}");
        }
    }

    #[test]
    fn no_self_transitions() {
        for status in FulfillmentStatus::ALL {
            assert!(!status.can_transition(status), "{status}");
        }
    }

    #[test]
    fn string_roundtrip() {
        for status in FulfillmentStatus::ALL {
            let parsed: FulfillmentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("in_production".parse::<FulfillmentStatus>().is_err());
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&CancelRequested).unwrap();
        assert_eq!(json, "\"cancel_requested\"");
        let back: FulfillmentStatus = serde_json::from_str("\"shipped\"").unwrap();
        assert_eq!(back, Shipped);
    }
}
