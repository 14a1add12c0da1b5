use chrono::{DateTime, Utc};

use crate::{
    db::{
        traits::{AllocationResult, TransitionResult},
        DatabaseError,
    },
    db_types::{NewOrder, NewPaymentVerification, Order, OrderId, PaymentStatus, PaymentVerification},
};

/// The order lifecycle as seen by the storage backend.
///
/// Status transitions are one-directional: `pending` may become `paid`, `expired` or `cancelled`, and `paid` may become
/// `refunded`. Every transition is a compare-and-set on the current status, so whichever of two racing calls reaches
/// the backend first wins and the other receives [`TransitionResult::Rejected`].
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// In a single atomic transaction,
    /// * stores the order and its lines,
    /// * for every line, reserves the oldest unsold units of the product (FIFO), marks them sold to the order and
    ///   creates their sold-account records,
    /// * stores the payment verification record.
    ///
    /// If any line cannot be filled, nothing is written and [`DatabaseError::InsufficientStock`] lists every short
    /// line. Concurrent calls competing for the same units are serialized by the database; a unit is never allocated
    /// twice.
    async fn allocate_order(
        &self,
        order: NewOrder,
        verification: NewPaymentVerification,
    ) -> Result<AllocationResult, DatabaseError>;

    /// Returns every unit allocated to the order to the unsold pool and removes its sold-account records.
    /// Returns the number of units restored. Calling this for an order with no allocated units is a no-op.
    async fn restore_stock(&self, order_id: &OrderId) -> Result<u64, DatabaseError>;

    /// Fetches the order, including its lines.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, DatabaseError>;

    async fn fetch_orders_for_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, DatabaseError>;

    async fn fetch_verification(&self, order_id: &OrderId) -> Result<Option<PaymentVerification>, DatabaseError>;

    /// `pending -> paid`. Also stamps the verification record as verified.
    async fn mark_paid(&self, order_id: &OrderId, now: DateTime<Utc>) -> Result<TransitionResult, DatabaseError>;

    /// `pending -> expired | cancelled`, restoring the order's stock in the same transaction.
    ///
    /// `status` must be [`PaymentStatus::Expired`] or [`PaymentStatus::Cancelled`].
    async fn annul_order(
        &self,
        order_id: &OrderId,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<TransitionResult, DatabaseError>;

    /// `paid -> refunded`. This only records the refund; delivered units stay sold.
    async fn mark_refunded(&self, order_id: &OrderId, now: DateTime<Utc>) -> Result<TransitionResult, DatabaseError>;

    /// Pending orders whose QR expired at or before `now`, oldest first.
    async fn fetch_expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<Order>, DatabaseError>;

    /// Paid orders that have not been reported to the admins yet, oldest first.
    async fn fetch_unreported_paid(&self) -> Result<Vec<Order>, DatabaseError>;

    /// Claims the admin sale report for a paid order. Returns `true` for exactly one caller per order.
    async fn claim_admin_notification(&self, order_id: &OrderId, now: DateTime<Utc>) -> Result<bool, DatabaseError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
