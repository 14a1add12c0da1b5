use qris_common::Rupiah;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderId, PaymentStatus, SoldAccountRecord, StockLevel},
    verification::ManipulationReason,
};

/// A verified payment. Carries everything the delivery collaborator needs to hand the goods to the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub sold_accounts: Vec<SoldAccountRecord>,
    pub buyer_id: String,
}

impl OrderPaidEvent {
    pub fn new(order: Order, sold_accounts: Vec<SoldAccountRecord>) -> Self {
        let buyer_id = order.buyer_id.clone();
        Self { order, sold_accounts, buyer_id }
    }
}

/// A sale report for the admins. Emitted exactly once per paid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReportEvent {
    pub order: Order,
    pub sold_accounts: Vec<SoldAccountRecord>,
    pub buyer_id: String,
    pub paid_amount: Rupiah,
}

impl SaleReportEvent {
    pub fn new(order: Order, sold_accounts: Vec<SoldAccountRecord>) -> Self {
        let buyer_id = order.buyer_id.clone();
        let paid_amount = order.total_amount;
        Self { order, sold_accounts, buyer_id, paid_amount }
    }
}

/// An order that expired or was cancelled before payment. Its stock is already back on the shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order_id: OrderId,
    pub buyer_id: String,
    pub total_amount: Rupiah,
    pub status: PaymentStatus,
}

impl OrderAnnulledEvent {
    pub fn new(order: &Order) -> Self {
        Self {
            order_id: order.order_id.clone(),
            buyer_id: order.buyer_id.clone(),
            total_amount: order.total_amount,
            status: order.status,
        }
    }
}

/// A payment claim that failed verification. For admin eyes only: it contains the expected amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManipulationEvent {
    pub order_id: OrderId,
    pub expected_amount: Rupiah,
    pub received_amount: Rupiah,
    pub buyer_id: String,
    pub reason: ManipulationReason,
}

/// Products that have run out or are running low.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockEvent {
    pub threshold: i64,
    pub out_of_stock: Vec<StockLevel>,
    pub low_stock: Vec<StockLevel>,
}

impl LowStockEvent {
    /// Sorts stock levels into out-of-stock and low-stock buckets. Returns `None` if there is nothing to report.
    pub fn from_levels(levels: Vec<StockLevel>, threshold: i64) -> Option<Self> {
        let (out_of_stock, rest): (Vec<_>, Vec<_>) = levels.into_iter().partition(StockLevel::is_out_of_stock);
        let low_stock = rest.into_iter().filter(|l| l.is_low(threshold)).collect::<Vec<_>>();
        if out_of_stock.is_empty() && low_stock.is_empty() {
            None
        } else {
            Some(Self { threshold, out_of_stock, low_stock })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPaid(OrderPaidEvent),
    SaleReport(SaleReportEvent),
    OrderAnnulled(OrderAnnulledEvent),
    Manipulation(ManipulationEvent),
    LowStock(LowStockEvent),
}
