use crate::{
    db::DatabaseError,
    db_types::{DigitalAccount, NewDigitalAccount, NewProduct, OrderId, Product, SoldAccountRecord, StockLevel},
};

/// Product catalogue and inventory queries.
///
/// Nothing here flips a unit's `sold` flag. Stock only leaves the shelf through
/// [`OrderManagement::allocate_order`](crate::OrderManagement::allocate_order) and returns through
/// [`OrderManagement::restore_stock`](crate::OrderManagement::restore_stock).
#[allow(async_fn_in_trait)]
pub trait InventoryManagement: Clone {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, DatabaseError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, DatabaseError>;

    async fn fetch_products(&self) -> Result<Vec<Product>, DatabaseError>;

    /// Adds units to the pools of their products. All units are inserted, or none are.
    async fn insert_accounts(&self, accounts: Vec<NewDigitalAccount>) -> Result<Vec<DigitalAccount>, DatabaseError>;

    /// The number of unsold units of the product. This is a snapshot and is not a reservation.
    async fn available_units(&self, product_id: i64) -> Result<i64, DatabaseError>;

    /// Available, sold and total units for every active product.
    async fn stock_levels(&self) -> Result<Vec<StockLevel>, DatabaseError>;

    async fn sold_accounts_for_order(&self, order_id: &OrderId) -> Result<Vec<SoldAccountRecord>, DatabaseError>;
}
