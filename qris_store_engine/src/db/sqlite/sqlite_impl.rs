//! `SqliteDatabase` is the SQLite implementation of the store engine backend traits.
use std::{collections::BTreeMap, fmt::Debug};

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::{accounts, new_pool, orders, products, verifications};
use crate::{
    db::{
        traits::{AllocationResult, InventoryManagement, OrderManagement, TransitionResult},
        DatabaseError,
    },
    db_types::{
        DigitalAccount,
        NewDigitalAccount,
        NewOrder,
        NewPaymentVerification,
        NewProduct,
        Order,
        OrderId,
        PaymentStatus,
        PaymentVerification,
        Product,
        SoldAccountRecord,
        StockLevel,
        StockShortfall,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("📦️ Database migrations complete");
        Ok(())
    }

    async fn fetch_current(&self, order_id: &OrderId) -> Result<Order, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await?.ok_or_else(|| DatabaseError::OrderNotFound(order_id.clone()))
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, Utc::now(), &mut conn).await?;
        debug!("📦️ Product #{} '{}' added at {}", product.id, product.name, product.price);
        Ok(product)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::fetch_products(&mut conn).await?;
        Ok(products)
    }

    async fn insert_accounts(&self, accounts: Vec<NewDigitalAccount>) -> Result<Vec<DigitalAccount>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut result = Vec::with_capacity(accounts.len());
        for account in accounts {
            let product_id = account.product_id;
            let inserted = accounts::insert_account(account, now, &mut tx).await.map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    DatabaseError::ProductNotFound(product_id)
                },
                e => DatabaseError::from(e),
            })?;
            result.push(inserted);
        }
        tx.commit().await?;
        debug!("📦️ {} digital accounts added to stock", result.len());
        Ok(result)
    }

    async fn available_units(&self, product_id: i64) -> Result<i64, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let count = accounts::count_available(product_id, &mut conn).await?;
        Ok(count)
    }

    async fn stock_levels(&self) -> Result<Vec<StockLevel>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let levels = products::stock_levels(&mut conn).await?;
        Ok(levels)
    }

    async fn sold_accounts_for_order(&self, order_id: &OrderId) -> Result<Vec<SoldAccountRecord>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let records = accounts::sold_records_for_order(order_id, &mut conn).await?;
        Ok(records)
    }
}

impl OrderManagement for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn allocate_order(
        &self,
        order: NewOrder,
        verification: NewPaymentVerification,
    ) -> Result<AllocationResult, DatabaseError> {
        if verification.order_id != order.order_id {
            return Err(DatabaseError::QueryError(format!(
                "Verification record for {} cannot be attached to order {}",
                verification.order_id, order.order_id
            )));
        }
        let total = order
            .total_amount()
            .ok_or_else(|| DatabaseError::QueryError(format!("The total of order {} overflows", order.order_id)))?;
        let mut tx = self.pool.begin().await?;
        // Writing first takes the database write lock, which serializes competing allocations from here on.
        let mut stored = orders::insert_order(&order, total, &mut tx).await.map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DatabaseError::DuplicateOrder(order.order_id.clone())
            },
            e => DatabaseError::from(e),
        })?;

        let quantities = order.quantities();
        let names = order.lines.iter().map(|l| (l.product_id, l.product_name.clone())).collect::<BTreeMap<_, _>>();
        let mut shortfalls = Vec::new();
        for (&product_id, &requested) in &quantities {
            let available = accounts::count_available(product_id, &mut tx).await?;
            if available < requested {
                let product_name = names.get(&product_id).cloned().unwrap_or_default();
                shortfalls.push(StockShortfall { product_id, product_name, requested, available });
            }
        }
        if !shortfalls.is_empty() {
            tx.rollback().await?;
            debug!("📦️ Order {} rolled back. {} lines cannot be filled", order.order_id, shortfalls.len());
            return Err(DatabaseError::InsufficientStock(shortfalls));
        }

        for line in &order.lines {
            let line = orders::insert_line(&order.order_id, line, &mut tx).await?;
            stored.lines.push(line);
        }
        let now = order.created_at;
        let mut allocated = Vec::with_capacity(quantities.len());
        for (&product_id, &requested) in &quantities {
            let units =
                accounts::allocate_units(product_id, requested, &order.order_id, &order.buyer_id, now, &mut tx).await?;
            if units.len() as i64 != requested {
                // Cannot happen while the write lock is held, but never hand out a partial order
                tx.rollback().await?;
                return Err(DatabaseError::QueryError(format!(
                    "Expected to allocate {requested} units of product #{product_id}, got {}",
                    units.len()
                )));
            }
            let product_name = names.get(&product_id).cloned().unwrap_or_default();
            for unit in &units {
                accounts::insert_sold_record(unit, &order.order_id, &order.buyer_id, &product_name, now, &mut tx)
                    .await?;
            }
            allocated.extend(units);
        }
        verifications::insert_verification(verification, now, &mut tx).await?;
        tx.commit().await?;
        info!(
            "📦️ Order {} for {} committed with {} units reserved",
            stored.order_id,
            stored.total_amount,
            allocated.len()
        );
        Ok(AllocationResult { order: stored, accounts: allocated })
    }

    async fn restore_stock(&self, order_id: &OrderId) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let restored = accounts::restore_for_order(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(restored)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_buyer(buyer_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_verification(&self, order_id: &OrderId) -> Result<Option<PaymentVerification>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let verification = verifications::fetch_verification(order_id, &mut conn).await?;
        Ok(verification)
    }

    async fn mark_paid(&self, order_id: &OrderId, now: DateTime<Utc>) -> Result<TransitionResult, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let updated =
            orders::transition_status(order_id, PaymentStatus::Pending, PaymentStatus::Paid, now, &mut tx).await?;
        match updated {
            Some(order) => {
                verifications::mark_verified(order_id, now, &mut tx).await?;
                let order = orders::with_lines(order, &mut tx).await?;
                tx.commit().await?;
                Ok(TransitionResult::Transitioned(order))
            },
            None => {
                tx.rollback().await?;
                Ok(TransitionResult::Rejected(self.fetch_current(order_id).await?))
            },
        }
    }

    async fn annul_order(
        &self,
        order_id: &OrderId,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<TransitionResult, DatabaseError> {
        if !status.is_annulled() {
            return Err(DatabaseError::QueryError(format!("Orders cannot be annulled with status {status}")));
        }
        let mut tx = self.pool.begin().await?;
        let updated = orders::transition_status(order_id, PaymentStatus::Pending, status, now, &mut tx).await?;
        match updated {
            Some(order) => {
                let restored = accounts::restore_for_order(order_id, &mut tx).await?;
                let order = orders::with_lines(order, &mut tx).await?;
                tx.commit().await?;
                debug!("📦️ Order {order_id} is {status}. {restored} units restored");
                Ok(TransitionResult::Transitioned(order))
            },
            None => {
                tx.rollback().await?;
                Ok(TransitionResult::Rejected(self.fetch_current(order_id).await?))
            },
        }
    }

    async fn mark_refunded(&self, order_id: &OrderId, now: DateTime<Utc>) -> Result<TransitionResult, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let updated =
            orders::transition_status(order_id, PaymentStatus::Paid, PaymentStatus::Refunded, now, &mut tx).await?;
        match updated {
            Some(order) => {
                let order = orders::with_lines(order, &mut tx).await?;
                tx.commit().await?;
                Ok(TransitionResult::Transitioned(order))
            },
            None => {
                tx.rollback().await?;
                Ok(TransitionResult::Rejected(self.fetch_current(order_id).await?))
            },
        }
    }

    async fn fetch_expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<Order>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_expired_pending(now, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_unreported_paid(&self) -> Result<Vec<Order>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_unreported_paid(&mut conn).await?;
        Ok(orders)
    }

    async fn claim_admin_notification(&self, order_id: &OrderId, now: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let claimed = orders::claim_admin_notification(order_id, now, &mut conn).await?;
        Ok(claimed)
    }

    async fn close(&mut self) -> Result<(), DatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}
