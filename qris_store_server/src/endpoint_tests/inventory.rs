use actix_web::{http::StatusCode, test, test::TestRequest, App};
use qris_store_engine::test_utils::seed_product;
use serde_json::json;

use super::helpers::{admins, configured_context, json_body, ADMIN, MAX_UPLOAD_BYTES};
use crate::{helpers::ADMIN_ID_HEADER, server::configure_app};

#[actix_web::test]
async fn admins_stock_the_catalogue() {
    let _ = env_logger::try_init().ok();
    let ctx = configured_context().await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;

    let req = TestRequest::post()
        .uri("/products")
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(json!({ "name": "Canva Pro", "description": "1 month", "price": 15_000 }))
        .to_request();
    let (status, product) = json_body(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = product["id"].as_i64().unwrap();

    let req = TestRequest::post()
        .uri(&format!("/products/{product_id}/accounts"))
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(json!([
            { "content": "user1@example.com:hunter2" },
            { "content": "https://example.com/invite/abc", "content_kind": "link" }
        ]))
        .to_request();
    let (status, body) = json_body(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);

    let req = TestRequest::get().uri("/stock").insert_header((ADMIN_ID_HEADER, ADMIN)).to_request();
    let (status, body) = json_body(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    let level = &body.as_array().unwrap()[0];
    assert_eq!(level["name"], "Canva Pro");
    assert_eq!(level["available"], 2);
    assert_eq!(level["sold"], 0);

    let req = TestRequest::get().uri("/products").to_request();
    let (status, body) = json_body(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn inventory_changes_are_admin_only() {
    let ctx = configured_context().await;
    let product = seed_product(&ctx.db, "Spotify", 20_000, 1).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;

    let req = TestRequest::post().uri("/products").set_json(json!({ "name": "Free stuff", "price": 1 })).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    let req = TestRequest::post()
        .uri(&format!("/products/{}/accounts", product.id))
        .set_json(json!([{ "content": "x" }]))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    let req = TestRequest::get().uri("/stock").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn invalid_inventory_requests() {
    let ctx = configured_context().await;
    let product = seed_product(&ctx.db, "Spotify", 20_000, 1).await;
    let app = test::init_service(App::new().configure(configure_app(ctx, admins(), MAX_UPLOAD_BYTES))).await;

    let req = TestRequest::post()
        .uri("/products")
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(json!({ "name": "Netflix", "price": 0 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
        .uri(&format!("/products/{}/accounts", product.id))
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(json!([]))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
        .uri(&format!("/products/{}/accounts", product.id + 100))
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(json!([{ "content": "orphan" }]))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
