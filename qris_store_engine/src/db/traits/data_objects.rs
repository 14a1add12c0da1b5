use serde::{Deserialize, Serialize};

use crate::db_types::{DigitalAccount, Order, OrderId};

/// The outcome of a new order together with its stock reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResult {
    pub order: Order,
    /// The units reserved for the order, in allocation order
    pub accounts: Vec<DigitalAccount>,
}

/// The outcome of a compare-and-set status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionResult {
    /// The order was pending and now carries the new status.
    Transitioned(Order),
    /// The order had already left the pending state. It is returned unchanged.
    Rejected(Order),
}

impl TransitionResult {
    pub fn order(&self) -> &Order {
        match self {
            TransitionResult::Transitioned(o) | TransitionResult::Rejected(o) => o,
        }
    }

    pub fn is_transitioned(&self) -> bool {
        matches!(self, TransitionResult::Transitioned(_))
    }
}

/// The outcome of one expiry sweep. Failures are collected per order so that one bad order does not block the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpiryResult {
    pub expired: Vec<Order>,
    pub failed: Vec<(OrderId, String)>,
}

impl ExpiryResult {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.failed.is_empty()
    }
}
