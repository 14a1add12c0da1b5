use chrono::{Duration, Utc};
use qris_common::Rupiah;
use qris_store_engine::{
    db_types::{NewProduct, PaymentStatus},
    events::EventProducers,
    merchant::MerchantProfileStore,
    order_objects::{CartLine, PaymentOutcome, Requester},
    qris::{extract_field, tags, validate_payload},
    store_api::inventory_api::MAX_UNIT_PRICE,
    InventoryApi,
    InventoryManagement,
    OrderManagement,
    StoreError,
};

mod support;
use support::*;

#[tokio::test]
async fn multi_unit_checkout_embeds_the_total() {
    let db = new_db().await;
    let product = seed_product(&db, "Netflix 1 Month", 50_000, 2).await;
    let api = flow_api(db.clone(), configured_profiles(), EventProducers::default());

    let result = api.checkout("buyer-1", &[CartLine::new(product.id, 2)]).await.unwrap();
    assert_eq!(result.order.status, PaymentStatus::Pending);
    assert_eq!(result.order.total_amount, Rupiah::from(100_000));
    assert_eq!(result.order.lines.len(), 1);
    assert_eq!(result.order.lines[0].quantity, 2);
    assert!(validate_payload(&result.qr_payload).is_ok());
    assert_eq!(extract_field(&result.qr_payload, tags::TRANSACTION_AMOUNT).as_deref(), Some("100000"));
    assert_eq!(result.qr_content_type, "image/svg+xml");
    assert!(!result.qr_image.is_empty());
    assert_eq!(db.available_units(product.id).await.unwrap(), 0);

    let sold = db.sold_accounts_for_order(&result.order.order_id).await.unwrap();
    assert_eq!(sold.len(), 2);
    assert!(sold.iter().all(|s| s.buyer_id == "buyer-1"));
    tear_down(db).await;
}

#[tokio::test]
async fn repeated_products_in_the_cart_are_merged() {
    let db = new_db().await;
    let product = seed_product(&db, "Spotify", 20_000, 3).await;
    let api = flow_api(db.clone(), configured_profiles(), EventProducers::default());
    let cart = [CartLine::new(product.id, 1), CartLine::new(product.id, 2)];
    let result = api.checkout("buyer-1", &cart).await.unwrap();
    assert_eq!(result.order.lines.len(), 1);
    assert_eq!(result.order.total_units(), 3);
    assert_eq!(result.order.total_amount, Rupiah::from(60_000));
    tear_down(db).await;
}

#[tokio::test]
async fn shortfalls_are_all_reported_and_nothing_is_reserved() {
    let db = new_db().await;
    let netflix = seed_product(&db, "Netflix 1 Month", 50_000, 1).await;
    let spotify = seed_product(&db, "Spotify", 20_000, 0).await;
    let canva = seed_product(&db, "Canva Pro", 30_000, 5).await;
    let api = flow_api(db.clone(), configured_profiles(), EventProducers::default());

    let cart = [CartLine::new(netflix.id, 3), CartLine::new(spotify.id, 1), CartLine::new(canva.id, 1)];
    match api.checkout("buyer-1", &cart).await {
        Err(StoreError::InsufficientStock(shortfalls)) => {
            assert_eq!(shortfalls.len(), 2);
            assert_eq!(shortfalls[0].product_id, netflix.id);
            assert_eq!(shortfalls[0].missing(), 2);
            assert_eq!(shortfalls[1].product_id, spotify.id);
        },
        other => panic!("Expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(db.available_units(canva.id).await.unwrap(), 5);
    assert_eq!(db.available_units(netflix.id).await.unwrap(), 1);
    assert!(db.fetch_orders_for_buyer("buyer-1").await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn checkout_without_a_merchant_profile_reserves_nothing() {
    let db = new_db().await;
    let product = seed_product(&db, "Netflix 1 Month", 50_000, 2).await;
    let api = flow_api(db.clone(), MerchantProfileStore::in_memory(), EventProducers::default());
    let err = api.checkout("buyer-1", &[CartLine::new(product.id, 1)]).await.unwrap_err();
    assert!(matches!(err, StoreError::NotConfigured));
    assert_eq!(db.available_units(product.id).await.unwrap(), 2);
    tear_down(db).await;
}

#[tokio::test]
async fn unknown_products_and_bad_carts() {
    let db = new_db().await;
    let api = flow_api(db.clone(), configured_profiles(), EventProducers::default());
    assert!(matches!(api.checkout("buyer-1", &[CartLine::new(99, 1)]).await, Err(StoreError::ProductNotFound(99))));
    assert!(matches!(api.checkout("buyer-1", &[]).await, Err(StoreError::InvalidCart(_))));
    assert!(matches!(api.checkout("  ", &[CartLine::new(1, 1)]).await, Err(StoreError::InvalidCart(_))));
    tear_down(db).await;
}

#[tokio::test]
async fn order_totals_that_overflow_are_refused() {
    let db = new_db().await;
    // Written straight to the database, past the listing price limit
    let product = seed_product(&db, "Gold bar", i64::MAX / 2 + 1, 2).await;
    let api = flow_api(db.clone(), configured_profiles(), EventProducers::default());

    let err = api.checkout("buyer-1", &[CartLine::new(product.id, 2)]).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidCart(_)), "Unexpected error: {err}");
    assert_eq!(db.available_units(product.id).await.unwrap(), 2);
    assert!(db.fetch_orders_for_buyer("buyer-1").await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn listing_prices_are_bounded() {
    let db = new_db().await;
    let inventory = InventoryApi::new(db.clone(), EventProducers::default());
    let too_dear = NewProduct::new("Gold bar", Rupiah::from(MAX_UNIT_PRICE + 1));
    assert!(matches!(inventory.add_product(too_dear).await, Err(StoreError::InvalidProduct(_))));
    let free = NewProduct::new("Freebie", Rupiah::from(0));
    assert!(matches!(inventory.add_product(free).await, Err(StoreError::InvalidProduct(_))));
    let product = inventory.add_product(NewProduct::new("Gold bar", Rupiah::from(MAX_UNIT_PRICE))).await.unwrap();
    assert_eq!(product.price, Rupiah::from(MAX_UNIT_PRICE));
    tear_down(db).await;
}

#[tokio::test]
async fn paying_releases_the_goods_once() {
    let db = new_db().await;
    let product = seed_product(&db, "Netflix 1 Month", 50_000, 2).await;
    let api = flow_api(db.clone(), configured_profiles(), EventProducers::default());
    let checkout = api.checkout("buyer-1", &[CartLine::new(product.id, 2)]).await.unwrap();
    let oid = checkout.order.order_id.clone();

    let outcome = api.confirm_payment(&oid, Rupiah::from(100_000)).await.unwrap();
    match &outcome {
        PaymentOutcome::Confirmed { order, sold_accounts } => {
            assert_eq!(order.status, PaymentStatus::Paid);
            assert!(order.completed_at.is_some());
            assert_eq!(sold_accounts.len(), 2);
        },
        other => panic!("Expected a confirmation, got {other:?}"),
    }
    let again = api.confirm_payment(&oid, Rupiah::from(100_000)).await.unwrap();
    assert!(again.is_already_paid());
    assert_eq!(again.order().completed_at, outcome.order().completed_at);

    let verification = db.fetch_verification(&oid).await.unwrap().unwrap();
    assert!(verification.verified_at.is_some());
    // Cancelling a paid order must not put its units back on sale
    assert!(matches!(
        api.cancel(&oid, Requester::Admin("admin".into())).await,
        Err(StoreError::InvalidStatus { status: PaymentStatus::Paid, .. })
    ));
    assert_eq!(db.available_units(product.id).await.unwrap(), 0);
    tear_down(db).await;
}

#[tokio::test]
async fn wrong_amounts_leave_the_order_pending() {
    let db = new_db().await;
    let product = seed_product(&db, "Netflix 1 Month", 50_000, 1).await;
    let api = flow_api(db.clone(), configured_profiles(), EventProducers::default());
    let checkout = api.checkout("buyer-1", &[CartLine::new(product.id, 1)]).await.unwrap();
    let oid = checkout.order.order_id.clone();

    let err = api.confirm_payment(&oid, Rupiah::from(5_000)).await.unwrap_err();
    assert!(matches!(&err, StoreError::ManipulationDetected(id) if *id == oid));
    assert!(!err.to_string().contains("Rp"));
    assert!(!err.to_string().contains("50.000"));
    let order = db.fetch_order(&oid).await.unwrap().unwrap();
    assert_eq!(order.status, PaymentStatus::Pending);

    // The genuine payment still goes through afterwards
    let outcome = api.confirm_payment(&oid, Rupiah::from(50_000)).await.unwrap();
    assert_eq!(outcome.order().status, PaymentStatus::Paid);
    tear_down(db).await;
}

#[tokio::test]
async fn expired_orders_cannot_be_paid() {
    let db = new_db().await;
    let product = seed_product(&db, "Netflix 1 Month", 50_000, 1).await;
    let api = flow_api(db.clone(), configured_profiles(), EventProducers::default());
    let an_hour_ago = Utc::now() - Duration::hours(1);
    let checkout = api.checkout_at("buyer-1", &[CartLine::new(product.id, 1)], an_hour_ago).await.unwrap();
    let oid = checkout.order.order_id.clone();
    assert_eq!(db.available_units(product.id).await.unwrap(), 0);

    let sweep = api.expire_old_orders().await.unwrap();
    assert_eq!(sweep.expired.len(), 1);
    assert!(sweep.failed.is_empty());
    assert_eq!(sweep.expired[0].status, PaymentStatus::Expired);
    assert_eq!(db.available_units(product.id).await.unwrap(), 1);

    let err = api.confirm_payment(&oid, Rupiah::from(50_000)).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidStatus { status: PaymentStatus::Expired, .. }));
    // A second sweep has nothing to do
    assert!(api.expire_old_orders().await.unwrap().is_empty());
    assert_eq!(db.available_units(product.id).await.unwrap(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn late_payment_claims_expire_the_order() {
    let db = new_db().await;
    let product = seed_product(&db, "Netflix 1 Month", 50_000, 1).await;
    let api = flow_api(db.clone(), configured_profiles(), EventProducers::default());
    let an_hour_ago = Utc::now() - Duration::hours(1);
    let checkout = api.checkout_at("buyer-1", &[CartLine::new(product.id, 1)], an_hour_ago).await.unwrap();
    let oid = checkout.order.order_id;

    let err = api.confirm_payment(&oid, Rupiah::from(50_000)).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidStatus { status: PaymentStatus::Expired, .. }));
    assert_eq!(db.available_units(product.id).await.unwrap(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn buyers_can_only_cancel_their_own_orders() {
    let db = new_db().await;
    let product = seed_product(&db, "Netflix 1 Month", 50_000, 1).await;
    let api = flow_api(db.clone(), configured_profiles(), EventProducers::default());
    let oid = api.checkout("alice", &[CartLine::new(product.id, 1)]).await.unwrap().order.order_id;

    let err = api.cancel(&oid, Requester::Buyer("mallory".into())).await.unwrap_err();
    assert!(matches!(err, StoreError::Forbidden(_)));
    assert_eq!(db.available_units(product.id).await.unwrap(), 0);

    let order = api.cancel(&oid, Requester::Buyer("alice".into())).await.unwrap();
    assert_eq!(order.status, PaymentStatus::Cancelled);
    assert_eq!(db.available_units(product.id).await.unwrap(), 1);
    assert!(db.sold_accounts_for_order(&oid).await.unwrap().is_empty());

    // Restoring an order twice changes nothing
    assert_eq!(db.restore_stock(&oid).await.unwrap(), 0);
    assert_eq!(db.available_units(product.id).await.unwrap(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn refunds_only_apply_to_paid_orders() {
    let db = new_db().await;
    let product = seed_product(&db, "Netflix 1 Month", 50_000, 2).await;
    let api = flow_api(db.clone(), configured_profiles(), EventProducers::default());
    let oid = api.checkout("alice", &[CartLine::new(product.id, 1)]).await.unwrap().order.order_id;
    assert!(matches!(api.refund(&oid).await, Err(StoreError::InvalidStatus { status: PaymentStatus::Pending, .. })));
    api.confirm_payment(&oid, Rupiah::from(50_000)).await.unwrap();
    let order = api.refund(&oid).await.unwrap();
    assert_eq!(order.status, PaymentStatus::Refunded);
    assert_eq!(db.available_units(product.id).await.unwrap(), 1);
    tear_down(db).await;
}
