#![allow(dead_code)]
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use log::*;
use qris_store_engine::{
    events::EventProducers,
    merchant::MerchantProfileStore,
    test_utils,
    OrderFlowApi,
    OrderManagement,
    SqliteDatabase,
};
pub use qris_store_engine::test_utils::{configured_profiles, seed_product, STATIC_QRIS_PAYLOAD};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn new_db() -> SqliteDatabase {
    test_utils::new_test_db().await
}

pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    let _ = Sqlite::drop_database(&url).await;
}

pub fn flow_api(
    db: SqliteDatabase,
    profiles: MerchantProfileStore,
    producers: EventProducers,
) -> OrderFlowApi<SqliteDatabase> {
    test_utils::order_flow_api(db, profiles, producers)
}

#[derive(Default, Clone)]
pub struct HookCalled {
    called: Arc<AtomicUsize>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.called.load(Ordering::SeqCst)
    }
}
