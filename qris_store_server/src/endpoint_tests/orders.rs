use actix_web::{http::StatusCode, test, test::TestRequest, App};
use qris_store_engine::test_utils::seed_product;
use serde_json::{json, Value};

use super::helpers::{admins, configured_context, json_body, ADMIN, MAX_UPLOAD_BYTES};
use crate::{helpers::ADMIN_ID_HEADER, server::configure_app};

fn checkout_request(buyer: &str, product_id: i64, quantity: i64) -> TestRequest {
    TestRequest::post()
        .uri("/checkout")
        .set_json(json!({ "buyer_id": buyer, "items": [{ "product_id": product_id, "quantity": quantity }] }))
}

fn order_id(body: &Value) -> String {
    body["order"]["order_id"].as_str().expect("order_id missing from checkout response").to_string()
}

#[actix_web::test]
async fn health_check() {
    let ctx = configured_context().await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;
    let res = test::call_service(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn checkout_returns_a_dynamic_qr_and_reserves_stock() {
    let _ = env_logger::try_init().ok();
    let ctx = configured_context().await;
    let product = seed_product(&ctx.db, "Netflix Premium", 50_000, 1).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;

    let res = test::call_service(&app, checkout_request("buyer-1", product.id, 1).to_request()).await;
    let (status, body) = json_body(res).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(body["order"]["total_amount"], 50_000);
    assert_eq!(body["qr_content_type"], "image/svg+xml");
    assert!(body["qr_payload"].as_str().unwrap().contains("540550000"));
    assert!(!body["qr_image"].as_str().unwrap().is_empty());

    // The only unit is reserved now
    let res = test::call_service(&app, checkout_request("buyer-2", product.id, 1).to_request()).await;
    let (status, body) = json_body(res).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Netflix Premium"));
}

#[actix_web::test]
async fn checkout_rejects_bad_carts() {
    let ctx = configured_context().await;
    let product = seed_product(&ctx.db, "Spotify", 20_000, 3).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;

    let res = test::call_service(&app, checkout_request("buyer-1", product.id, 0).to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let res = test::call_service(&app, checkout_request("buyer-1", product.id + 100, 1).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn payment_confirmation_is_admin_only() {
    let _ = env_logger::try_init().ok();
    let ctx = configured_context().await;
    let product = seed_product(&ctx.db, "Netflix Premium", 50_000, 2).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;
    let res = test::call_service(&app, checkout_request("buyer-1", product.id, 1).to_request()).await;
    let (_, body) = json_body(res).await;
    let order_id = order_id(&body);
    let confirmation = json!({ "order_id": order_id, "amount": 50_000 });

    let req = TestRequest::post().uri("/payments/confirm").set_json(&confirmation).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    let req = TestRequest::post()
        .uri("/payments/confirm")
        .insert_header((ADMIN_ID_HEADER, "not-an-admin"))
        .set_json(&confirmation)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = TestRequest::post()
        .uri("/payments/confirm")
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(&confirmation)
        .to_request();
    let (status, body) = json_body(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "confirmed");
    assert_eq!(body["order"]["status"], "paid");
    assert_eq!(body["sold_accounts"].as_array().unwrap().len(), 1);

    // A repeat is harmless
    let req = TestRequest::post()
        .uri("/payments/confirm")
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(&confirmation)
        .to_request();
    let (status, body) = json_body(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "already_paid");
}

#[actix_web::test]
async fn wrong_amount_is_rejected_without_revealing_the_price() {
    let ctx = configured_context().await;
    let product = seed_product(&ctx.db, "Netflix Premium", 50_000, 1).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;
    let res = test::call_service(&app, checkout_request("buyer-1", product.id, 1).to_request()).await;
    let (_, body) = json_body(res).await;
    let order_id = order_id(&body);

    let req = TestRequest::post()
        .uri("/payments/confirm")
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(json!({ "order_id": order_id, "amount": 45_000 }))
        .to_request();
    let (status, body) = json_body(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains(&order_id));
    assert!(!message.contains("Rp"));

    let req = TestRequest::get().uri(&format!("/orders/{order_id}")).to_request();
    let (status, body) = json_body(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
}

#[actix_web::test]
async fn buyers_cancel_only_their_own_orders() {
    let ctx = configured_context().await;
    let product = seed_product(&ctx.db, "Spotify", 20_000, 1).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;
    let res = test::call_service(&app, checkout_request("buyer-1", product.id, 1).to_request()).await;
    let (_, body) = json_body(res).await;
    let order_id = order_id(&body);
    let uri = format!("/orders/{order_id}/cancel");

    let req = TestRequest::post().uri(&uri).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    let req = TestRequest::post().uri(&uri).set_json(json!({ "buyer_id": "buyer-2" })).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = TestRequest::post().uri(&uri).set_json(json!({ "buyer_id": "buyer-1" })).to_request();
    let (status, body) = json_body(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    // The unit is back on sale
    let res = test::call_service(&app, checkout_request("buyer-2", product.id, 1).to_request()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn admins_cancel_any_pending_order() {
    let ctx = configured_context().await;
    let product = seed_product(&ctx.db, "Spotify", 20_000, 1).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;
    let res = test::call_service(&app, checkout_request("buyer-1", product.id, 1).to_request()).await;
    let (_, body) = json_body(res).await;
    let order_id = order_id(&body);

    let req = TestRequest::post()
        .uri(&format!("/orders/{order_id}/cancel"))
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .to_request();
    let (status, body) = json_body(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let req = TestRequest::post()
        .uri(&format!("/orders/{order_id}/cancel"))
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn unknown_orders() {
    let ctx = configured_context().await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;
    let req = TestRequest::get().uri("/orders/ORD-00000000-00000000").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    let req = TestRequest::post()
        .uri("/payments/confirm")
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(json!({ "order_id": "ORD-00000000-00000000", "amount": 1_000 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
