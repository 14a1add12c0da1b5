use std::{future::Future, pin::Pin};

use chrono::{Duration, Utc};
use log::*;
use qris_common::Rupiah;
use qris_store_engine::{
    db_types::PaymentStatus,
    events::{EventHandlers, EventHooks},
    order_objects::CartLine,
    verification::ManipulationReason,
    InventoryApi,
    StoreError,
};
use tokio::sync::mpsc;

mod support;
use support::*;

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[tokio::test]
async fn paid_orders_are_delivered_and_reported_once() {
    let db = new_db().await;
    let product = seed_product(&db, "Netflix 1 Month", 50_000, 2).await;
    let paid = HookCalled::default();
    let reported = HookCalled::default();
    let mut hooks = EventHooks::default();
    let (p, r) = (paid.clone(), reported.clone());
    hooks
        .on_order_paid(move |ev| {
            info!("🪝️ Order paid: {}", ev.order.order_id);
            assert_eq!(ev.sold_accounts.len(), 2);
            p.called();
            Box::pin(async {}) as BoxedFuture
        })
        .on_sale_report(move |ev| {
            assert_eq!(ev.paid_amount, Rupiah::from(100_000));
            r.called();
            Box::pin(async {}) as BoxedFuture
        });
    let handlers = EventHandlers::new(16, hooks);
    let api = flow_api(db.clone(), configured_profiles(), handlers.producers());
    let tasks = handlers.start_handlers();

    let oid = api.checkout("buyer-1", &[CartLine::new(product.id, 2)]).await.unwrap().order.order_id;
    api.confirm_payment(&oid, Rupiah::from(100_000)).await.unwrap();
    api.confirm_payment(&oid, Rupiah::from(100_000)).await.unwrap();
    assert_eq!(api.notify_unreported_sales().await.unwrap(), 0);

    drop(api);
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(paid.count(), 1);
    assert_eq!(reported.count(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn manipulation_is_reported_to_admins_once_per_claim() {
    let db = new_db().await;
    let product = seed_product(&db, "Netflix 1 Month", 50_000, 1).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut hooks = EventHooks::default();
    hooks.on_manipulation(move |ev| {
        let _ = tx.send(ev);
        Box::pin(async {}) as BoxedFuture
    });
    let handlers = EventHandlers::new(16, hooks);
    let api = flow_api(db.clone(), configured_profiles(), handlers.producers());
    let tasks = handlers.start_handlers();

    let oid = api.checkout("buyer-1", &[CartLine::new(product.id, 1)]).await.unwrap().order.order_id;
    let err = api.confirm_payment(&oid, Rupiah::from(5_000)).await.unwrap_err();
    assert!(matches!(err, StoreError::ManipulationDetected(_)));
    drop(api);
    for task in tasks {
        task.await.unwrap();
    }

    let event = rx.recv().await.expect("No manipulation event");
    assert_eq!(event.order_id, oid);
    assert_eq!(event.expected_amount, Rupiah::from(50_000));
    assert_eq!(event.received_amount, Rupiah::from(5_000));
    assert_eq!(event.buyer_id, "buyer-1");
    assert_eq!(event.reason, ManipulationReason::ClaimedAmountMismatch);
    assert!(rx.recv().await.is_none());
    tear_down(db).await;
}

#[tokio::test]
async fn expired_and_cancelled_orders_are_announced() {
    let db = new_db().await;
    let product = seed_product(&db, "Netflix 1 Month", 50_000, 2).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut hooks = EventHooks::default();
    hooks.on_order_annulled(move |ev| {
        let _ = tx.send(ev.status);
        Box::pin(async {}) as BoxedFuture
    });
    let handlers = EventHandlers::new(16, hooks);
    let api = flow_api(db.clone(), configured_profiles(), handlers.producers());
    let tasks = handlers.start_handlers();

    let earlier = Utc::now() - Duration::minutes(10);
    api.checkout_at("buyer-1", &[CartLine::new(product.id, 1)], earlier).await.unwrap();
    let fresh = api.checkout("buyer-2", &[CartLine::new(product.id, 1)]).await.unwrap().order.order_id;
    let sweep = api.expire_old_orders().await.unwrap();
    assert_eq!(sweep.expired.len(), 1);
    api.cancel(&fresh, qris_store_engine::order_objects::Requester::System).await.unwrap();
    drop(api);
    for task in tasks {
        task.await.unwrap();
    }

    let mut statuses = Vec::new();
    while let Some(status) = rx.recv().await {
        statuses.push(status);
    }
    statuses.sort_by_key(|s| s.to_string());
    assert_eq!(statuses, vec![PaymentStatus::Cancelled, PaymentStatus::Expired]);
    tear_down(db).await;
}

#[tokio::test]
async fn low_stock_reports() {
    let db = new_db().await;
    seed_product(&db, "Netflix 1 Month", 50_000, 0).await;
    seed_product(&db, "Spotify", 20_000, 2).await;
    seed_product(&db, "Canva Pro", 30_000, 10).await;
    let low = HookCalled::default();
    let mut hooks = EventHooks::default();
    let l = low.clone();
    hooks.on_low_stock(move |ev| {
        assert_eq!(ev.out_of_stock.len(), 1);
        l.called();
        Box::pin(async {}) as BoxedFuture
    });
    let handlers = EventHandlers::new(16, hooks);
    let api = InventoryApi::new(db.clone(), handlers.producers());
    let tasks = handlers.start_handlers();

    let report = api.low_stock_report(3).await.unwrap().expect("Expected a report");
    assert_eq!(report.out_of_stock[0].name, "Netflix 1 Month");
    assert_eq!(report.low_stock.len(), 1);
    assert_eq!(report.low_stock[0].name, "Spotify");
    assert!(api.low_stock_report(0).await.unwrap().is_some());
    drop(api);
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(low.count(), 2);
    tear_down(db).await;
}
