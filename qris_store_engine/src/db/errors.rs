use thiserror::Error;

use crate::db_types::{OrderId, StockShortfall};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database driver error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Insufficient stock. {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    InsufficientStock(Vec<StockShortfall>),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Product #{0} does not exist")]
    ProductNotFound(i64),
    #[error("Order {0} already exists")]
    DuplicateOrder(OrderId),
}
