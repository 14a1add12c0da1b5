use std::sync::Arc;

use actix_web::{dev::ServiceResponse, http::StatusCode, test};
use qris_store_engine::{
    events::EventProducers,
    merchant::{MerchantProfileStore, QrImageDecoder, TextPayloadDecoder},
    qris::{default_qr_validity, DynamicQrGenerator},
    test_utils::{configured_profiles, new_test_db, test_verifier},
    SqliteDatabase,
};
use serde_json::Value;

use crate::{helpers::AdminIds, server::StoreContext};

pub const ADMIN: &str = "42";
pub const MAX_UPLOAD_BYTES: usize = 1024;

pub fn admins() -> AdminIds {
    AdminIds::new(vec![ADMIN.to_string()])
}

/// A store context over a fresh database, with the test merchant already configured
pub async fn configured_context() -> StoreContext {
    context(configured_profiles(), Arc::new(TextPayloadDecoder)).await
}

pub async fn context(profiles: MerchantProfileStore, decoder: Arc<dyn QrImageDecoder>) -> StoreContext {
    let db: SqliteDatabase = new_test_db().await;
    let qr = DynamicQrGenerator::new(profiles.with_max_upload_size(MAX_UPLOAD_BYTES), default_qr_validity());
    StoreContext::new(db, qr, test_verifier(), decoder, EventProducers::default())
}

pub async fn json_body(res: ServiceResponse) -> (StatusCode, Value) {
    let status = res.status();
    let body = test::read_body(res).await;
    let value = serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into()));
    (status, value)
}
