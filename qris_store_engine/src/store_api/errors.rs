use thiserror::Error;

use crate::{
    db::DatabaseError,
    db_types::{OrderId, PaymentStatus, StockShortfall},
    merchant::MerchantError,
    qris::{QrRenderError, QrisError},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("The QR code is not a valid QRIS payload. {0}")]
    MalformedPayload(String),
    #[error("The store has no merchant QRIS code yet. An admin must upload one first.")]
    NotConfigured,
    #[error("The uploaded image was rejected. {0}")]
    InvalidImage(String),
    #[error("The merchant details could not be read from the QR code. {0}")]
    ParseFailure(String),
    #[error("Insufficient stock. {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    InsufficientStock(Vec<StockShortfall>),
    /// Deliberately carries no amounts. Those are reported to the admins only.
    #[error("The payment for order {0} could not be verified and was rejected.")]
    ManipulationDetected(OrderId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Product #{0} does not exist")]
    ProductNotFound(i64),
    #[error("Invalid cart. {0}")]
    InvalidCart(String),
    #[error("Invalid product details. {0}")]
    InvalidProduct(String),
    #[error("Order {order_id} is {status}")]
    InvalidStatus { order_id: OrderId, status: PaymentStatus },
    #[error("Not allowed. {0}")]
    Forbidden(String),
    #[error("Could not render the payment QR. {0}")]
    RenderError(String),
    #[error("Could not save the merchant profile. {0}")]
    Storage(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DatabaseError> for StoreError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::InsufficientStock(shortfalls) => Self::InsufficientStock(shortfalls),
            DatabaseError::OrderNotFound(oid) => Self::OrderNotFound(oid),
            DatabaseError::ProductNotFound(id) => Self::ProductNotFound(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<QrisError> for StoreError {
    fn from(e: QrisError) -> Self {
        match e {
            QrisError::NotConfigured => Self::NotConfigured,
            QrisError::InvalidAmount(_) => Self::InvalidCart(e.to_string()),
            e => Self::MalformedPayload(e.to_string()),
        }
    }
}

impl From<MerchantError> for StoreError {
    fn from(e: MerchantError) -> Self {
        match e {
            MerchantError::InvalidImage(s) => Self::InvalidImage(s),
            MerchantError::MalformedPayload(e) => Self::MalformedPayload(e.to_string()),
            MerchantError::ParseFailure(s) => Self::ParseFailure(s),
            MerchantError::Storage(s) => Self::Storage(s),
        }
    }
}

impl From<QrRenderError> for StoreError {
    fn from(e: QrRenderError) -> Self {
        Self::RenderError(e.0)
    }
}
