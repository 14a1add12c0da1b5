use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, SoldAccountRecord};

/// One line of a buyer's cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

/// A successful checkout: the pending order and the payment QR the buyer must scan before `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order: Order,
    pub qr_payload: String,
    #[serde(skip)]
    pub qr_image: Vec<u8>,
    pub qr_content_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// The payment was verified just now and the goods released.
    Confirmed { order: Order, sold_accounts: Vec<SoldAccountRecord> },
    /// The order had already been paid. Nothing was done.
    AlreadyPaid { order: Order },
}

impl PaymentOutcome {
    pub fn order(&self) -> &Order {
        match self {
            PaymentOutcome::Confirmed { order, .. } | PaymentOutcome::AlreadyPaid { order } => order,
        }
    }

    pub fn is_already_paid(&self) -> bool {
        matches!(self, PaymentOutcome::AlreadyPaid { .. })
    }
}

/// Who is asking for a cancellation. Buyers may only cancel their own orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requester {
    Buyer(String),
    Admin(String),
    System,
}

impl Requester {
    pub fn may_cancel(&self, order: &Order) -> bool {
        match self {
            Requester::Buyer(id) => *id == order.buyer_id,
            Requester::Admin(_) | Requester::System => true,
        }
    }
}
