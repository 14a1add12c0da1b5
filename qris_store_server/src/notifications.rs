//! Default notification hooks. They log what a chat transport would send: goods to the buyer, sale reports and fraud
//! alerts to the admins, and the daily stock report. Account contents are never logged.
use std::{future::Future, pin::Pin};

use log::*;
use qris_store_engine::events::{
    EventHooks,
    LowStockEvent,
    ManipulationEvent,
    OrderAnnulledEvent,
    OrderPaidEvent,
    SaleReportEvent,
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_paid(|ev| {
            Box::pin(async move { info!("📬️ {}", delivery_message(&ev)) }) as HookFuture
        })
        .on_sale_report(|ev| {
            Box::pin(async move { info!("📬️ {}", sale_report_message(&ev)) }) as HookFuture
        })
        .on_order_annulled(|ev| {
            Box::pin(async move { info!("📬️ {}", annulled_message(&ev)) }) as HookFuture
        })
        .on_manipulation(|ev| {
            Box::pin(async move { warn!("🚨️ {}", manipulation_message(&ev)) }) as HookFuture
        })
        .on_low_stock(|ev| {
            Box::pin(async move { warn!("📬️ {}", low_stock_message(&ev)) }) as HookFuture
        });
    hooks
}

pub fn delivery_message(ev: &OrderPaidEvent) -> String {
    format!(
        "Order {} is paid. {} units ready for delivery to buyer {}",
        ev.order.order_id,
        ev.sold_accounts.len(),
        ev.buyer_id
    )
}

pub fn sale_report_message(ev: &SaleReportEvent) -> String {
    let lines = ev
        .order
        .lines
        .iter()
        .map(|l| format!("{} x{} @ {}", l.product_name, l.quantity, l.unit_price))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SALE: order {} by {} for {}. {lines}", ev.order.order_id, ev.buyer_id, ev.paid_amount)
}

pub fn annulled_message(ev: &OrderAnnulledEvent) -> String {
    format!("Order {} of buyer {} ({}) is {}. Stock returned", ev.order_id, ev.buyer_id, ev.total_amount, ev.status)
}

pub fn manipulation_message(ev: &ManipulationEvent) -> String {
    format!(
        "PAYMENT REJECTED for order {} (buyer {}): {}. Expected {}, claimed {}",
        ev.order_id, ev.buyer_id, ev.reason, ev.expected_amount, ev.received_amount
    )
}

pub fn low_stock_message(ev: &LowStockEvent) -> String {
    let mut parts = Vec::new();
    if !ev.out_of_stock.is_empty() {
        let names = ev.out_of_stock.iter().map(|l| l.name.as_str()).collect::<Vec<_>>().join(", ");
        parts.push(format!("Out of stock: {names}"));
    }
    if !ev.low_stock.is_empty() {
        let names =
            ev.low_stock.iter().map(|l| format!("{} ({} left)", l.name, l.available)).collect::<Vec<_>>().join(", ");
        parts.push(format!("Low stock (≤{}): {names}", ev.threshold));
    }
    format!("STOCK REPORT. {}", parts.join(". "))
}
