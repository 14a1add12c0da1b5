//! Fixtures shared by the unit tests and the integration tests of this crate and its dependants.
use std::sync::Arc;

use chrono::Utc;
use qris_common::{Rupiah, Secret};

use crate::{
    db_types::{ContentKind, NewDigitalAccount, NewProduct, Product},
    events::EventProducers,
    merchant::{MerchantProfile, MerchantProfileStore},
    qris::{default_qr_validity, DynamicQrGenerator, SvgQrRenderer},
    InventoryManagement,
    OrderFlowApi,
    PaymentVerifier,
    SqliteDatabase,
};

pub mod prepare_env;

/// A static QRIS code for "Premium Store", Jakarta
pub const STATIC_QRIS_PAYLOAD: &str = "00020101021126470014ID.CO.QRIS.WWW0118ID10203040506078900303UMI5204599953033605802ID5913Premium Store6007Jakarta6304DB0B";

pub const TEST_VERIFICATION_SECRET: &str = "test-verification-secret";

pub fn test_verifier() -> PaymentVerifier {
    PaymentVerifier::new(&Secret::new(TEST_VERIFICATION_SECRET.to_string())).expect("Test secret is valid")
}

/// An in-memory merchant profile store already holding [`STATIC_QRIS_PAYLOAD`]
pub fn configured_profiles() -> MerchantProfileStore {
    let store = MerchantProfileStore::in_memory();
    let profile = MerchantProfile::from_payload(STATIC_QRIS_PAYLOAD, Utc::now()).expect("Test payload is valid");
    store.replace(profile).expect("In-memory store cannot fail");
    store
}

/// A fresh, migrated database in the temp directory
pub async fn new_test_db() -> SqliteDatabase {
    let url = prepare_env::random_db_path();
    prepare_env::prepare_test_env(&url).await
}

pub fn order_flow_api(
    db: SqliteDatabase,
    profiles: MerchantProfileStore,
    producers: EventProducers,
) -> OrderFlowApi<SqliteDatabase> {
    let generator = DynamicQrGenerator::new(profiles, default_qr_validity());
    OrderFlowApi::new(db, generator, test_verifier(), Arc::new(SvgQrRenderer::default()), producers)
}

/// Adds a product with `units` distinct accounts in stock.
pub async fn seed_product(db: &SqliteDatabase, name: &str, price: i64, units: usize) -> Product {
    let product =
        db.insert_product(NewProduct::new(name, Rupiah::from(price))).await.expect("Error inserting test product");
    let accounts = (0..units)
        .map(|i| NewDigitalAccount::new(product.id, format!("{name} #{i}"), ContentKind::Account))
        .collect();
    db.insert_accounts(accounts).await.expect("Error inserting test accounts");
    product
}
