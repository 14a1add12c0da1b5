use std::sync::Arc;

use actix_web::{http::StatusCode, test, test::TestRequest, App};
use qris_store_engine::{
    merchant::{MerchantError, MerchantProfileStore},
    test_utils::{seed_product, STATIC_QRIS_PAYLOAD},
};
use serde_json::json;

use super::{
    helpers::{admins, context, json_body, ADMIN, MAX_UPLOAD_BYTES},
    mocks::MockDecoder,
};
use crate::{helpers::ADMIN_ID_HEADER, server::configure_app};

fn upload(admin: Option<&str>, image: &'static [u8]) -> TestRequest {
    let req = TestRequest::post().uri("/merchant/qris").set_payload(image);
    match admin {
        Some(id) => req.insert_header((ADMIN_ID_HEADER, id)),
        None => req,
    }
}

#[actix_web::test]
async fn uploaded_merchant_qr_enables_checkout() {
    let _ = env_logger::try_init().ok();
    let mut decoder = MockDecoder::new();
    decoder.expect_decode().times(1).returning(|_| Ok(STATIC_QRIS_PAYLOAD.to_string()));
    let ctx = context(MerchantProfileStore::in_memory(), Arc::new(decoder)).await;
    let product = seed_product(&ctx.db, "Netflix Premium", 50_000, 1).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;
    let checkout = || {
        TestRequest::post()
            .uri("/checkout")
            .set_json(json!({ "buyer_id": "buyer-1", "items": [{ "product_id": product.id, "quantity": 1 }] }))
            .to_request()
    };

    let status_request = || TestRequest::get().uri("/merchant").to_request();
    let (status, body) = json_body(test::call_service(&app, status_request()).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], false);
    assert_eq!(test::call_service(&app, checkout()).await.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = test::call_service(&app, upload(Some(ADMIN), b"a picture").to_request()).await;
    let (status, body) = json_body(res).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Premium Store");

    let (_, body) = json_body(test::call_service(&app, status_request()).await).await;
    assert_eq!(body["configured"], true);
    assert_eq!(test::call_service(&app, checkout()).await.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn unreadable_uploads_keep_the_current_profile() {
    let mut decoder = MockDecoder::new();
    decoder
        .expect_decode()
        .times(1)
        .returning(|_| Err(MerchantError::InvalidImage("No QR code was found in the upload".into())));
    let ctx = context(MerchantProfileStore::in_memory(), Arc::new(decoder)).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;

    let (status, body) = json_body(test::call_service(&app, upload(Some(ADMIN), b"a cat").to_request()).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("No QR code"));

    let (_, body) = json_body(test::call_service(&app, TestRequest::get().uri("/merchant").to_request()).await).await;
    assert_eq!(body["configured"], false);
}

#[actix_web::test]
async fn invalid_payloads_are_rejected() {
    let mut decoder = MockDecoder::new();
    decoder.expect_decode().times(1).returning(|_| Ok("000201010212".to_string()));
    let ctx = context(MerchantProfileStore::in_memory(), Arc::new(decoder)).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;

    let res = test::call_service(&app, upload(Some(ADMIN), b"not a qris code").to_request()).await;
    assert!(res.status().is_client_error());
}

#[actix_web::test]
async fn only_admins_upload() {
    let mut decoder = MockDecoder::new();
    decoder.expect_decode().times(0);
    let ctx = context(MerchantProfileStore::in_memory(), Arc::new(decoder)).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;

    let res = test::call_service(&app, upload(None, b"a picture").to_request()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = test::call_service(&app, upload(Some("buyer-1"), b"a picture").to_request()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn oversized_uploads_are_rejected_before_decoding() {
    static BIG: [u8; MAX_UPLOAD_BYTES + 1] = [b'0'; MAX_UPLOAD_BYTES + 1];
    let mut decoder = MockDecoder::new();
    decoder.expect_decode().times(0);
    let ctx = context(MerchantProfileStore::in_memory(), Arc::new(decoder)).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;

    let (status, body) = json_body(test::call_service(&app, upload(Some(ADMIN), &BIG).to_request()).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("limit"));
}
