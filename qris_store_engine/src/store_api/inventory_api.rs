use std::fmt::Debug;

use log::*;
use qris_common::Rupiah;

use crate::{
    db::traits::InventoryManagement,
    db_types::{DigitalAccount, NewDigitalAccount, NewProduct, OrderId, Product, SoldAccountRecord, StockLevel},
    events::{EventProducers, LowStockEvent},
    store_api::errors::StoreError,
};

/// The highest unit price a product can be listed at, Rp 1 trillion
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000_000;

/// Products, the digital units sold under them, and stock reporting.
pub struct InventoryApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    pub async fn add_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        if product.name.trim().is_empty() {
            return Err(StoreError::InvalidProduct("A product needs a name".into()));
        }
        if !product.price.is_positive() {
            return Err(StoreError::InvalidProduct(format!("The price must be positive, not {}", product.price)));
        }
        if product.price.value() > MAX_UNIT_PRICE {
            return Err(StoreError::InvalidProduct(format!(
                "The price may not exceed {}, but was {}",
                Rupiah::from(MAX_UNIT_PRICE),
                product.price
            )));
        }
        let product = self.db.insert_product(product).await?;
        info!("📦️ Product #{} '{}' added", product.id, product.name);
        Ok(product)
    }

    pub async fn products(&self) -> Result<Vec<Product>, StoreError> {
        let products = self.db.fetch_products().await?;
        Ok(products)
    }

    /// Adds units to stock. Either every unit is added, or none is.
    pub async fn add_accounts(&self, accounts: Vec<NewDigitalAccount>) -> Result<Vec<DigitalAccount>, StoreError> {
        if let Some(blank) = accounts.iter().find(|a| a.content.trim().is_empty()) {
            return Err(StoreError::InvalidProduct(format!(
                "A unit for product #{} has no content",
                blank.product_id
            )));
        }
        let added = self.db.insert_accounts(accounts).await?;
        info!("📦️ {} units added to stock", added.len());
        Ok(added)
    }

    pub async fn stock_summary(&self) -> Result<Vec<StockLevel>, StoreError> {
        let levels = self.db.stock_levels().await?;
        Ok(levels)
    }

    pub async fn sold_accounts(&self, order_id: &OrderId) -> Result<Vec<SoldAccountRecord>, StoreError> {
        let records = self.db.sold_accounts_for_order(order_id).await?;
        Ok(records)
    }

    /// Builds the low-stock report for `threshold` and publishes it. Returns `None`, and publishes nothing, when every
    /// product has more than `threshold` units.
    pub async fn low_stock_report(&self, threshold: i64) -> Result<Option<LowStockEvent>, StoreError> {
        let levels = self.db.stock_levels().await?;
        let report = LowStockEvent::from_levels(levels, threshold);
        if let Some(report) = &report {
            warn!(
                "📦️ {} products out of stock, {} running low",
                report.out_of_stock.len(),
                report.low_stock.len()
            );
            self.producers.publish_low_stock(report.clone()).await;
        }
        Ok(report)
    }
}
