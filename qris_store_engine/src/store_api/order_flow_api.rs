use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use chrono::{DateTime, Utc};
use log::*;
use qris_common::Rupiah;

use crate::{
    db::traits::{ExpiryResult, InventoryManagement, OrderManagement, TransitionResult},
    db_types::{NewOrder, NewOrderLine, NewPaymentVerification, Order, OrderId, PaymentStatus, StockShortfall},
    events::{EventProducers, ManipulationEvent, OrderAnnulledEvent, OrderPaidEvent, SaleReportEvent},
    qris::{DynamicQrGenerator, QrImageRenderer},
    store_api::{
        errors::StoreError,
        order_objects::{CartLine, CheckoutResult, PaymentOutcome, Requester},
    },
    verification::{ManipulationReason, PaymentVerifier},
};

/// `OrderFlowApi` is the primary API for moving orders through their lifecycle: checkout, payment confirmation,
/// cancellation, expiry and refunds.
///
/// Every status change is a compare-and-set in the backend, so concurrent callers (a payment confirmation racing the
/// expiry sweep, say) cannot both win.
pub struct OrderFlowApi<B> {
    db: B,
    qr: DynamicQrGenerator,
    verifier: PaymentVerifier,
    renderer: Arc<dyn QrImageRenderer>,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(
        db: B,
        qr: DynamicQrGenerator,
        verifier: PaymentVerifier,
        renderer: Arc<dyn QrImageRenderer>,
        producers: EventProducers,
    ) -> Self {
        Self { db, qr, verifier, renderer, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn qr_generator(&self) -> &DynamicQrGenerator {
        &self.qr
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + InventoryManagement
{
    /// Turns a cart into a pending order with its units reserved, and issues the payment QR for it.
    ///
    /// Repeated products in the cart are merged. Nothing is written if any product is unknown, inactive or short of
    /// stock; in the latter case every shortfall is reported, not just the first.
    pub async fn checkout(&self, buyer_id: &str, cart: &[CartLine]) -> Result<CheckoutResult, StoreError> {
        self.checkout_at(buyer_id, cart, Utc::now()).await
    }

    pub async fn checkout_at(
        &self,
        buyer_id: &str,
        cart: &[CartLine],
        now: DateTime<Utc>,
    ) -> Result<CheckoutResult, StoreError> {
        let buyer_id = buyer_id.trim();
        if buyer_id.is_empty() {
            return Err(StoreError::InvalidCart("A buyer id is required".into()));
        }
        let quantities = merge_cart(cart)?;
        let mut lines = Vec::with_capacity(quantities.len());
        let mut shortfalls = Vec::new();
        for (&product_id, &quantity) in &quantities {
            let product = self
                .db
                .fetch_product(product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or(StoreError::ProductNotFound(product_id))?;
            let available = self.db.available_units(product_id).await?;
            if available < quantity {
                shortfalls.push(StockShortfall {
                    product_id,
                    product_name: product.name.clone(),
                    requested: quantity,
                    available,
                });
            }
            lines.push(NewOrderLine { product_id, product_name: product.name, quantity, unit_price: product.price });
        }
        if !shortfalls.is_empty() {
            debug!("🛒️ Checkout for {buyer_id} refused. {} products are short of stock", shortfalls.len());
            return Err(StoreError::InsufficientStock(shortfalls));
        }

        let order_id = OrderId::generate_at(now);
        let mut order = NewOrder::new(order_id.clone(), buyer_id, lines);
        order.created_at = now;
        let total = order
            .total_amount()
            .ok_or_else(|| StoreError::InvalidCart("The order total is larger than any payment can be".into()))?;
        // The QR is produced before anything is written, so a missing merchant profile or a render failure leaves
        // stock untouched.
        let qr = self.qr.generate_at(total, &order_id, now)?;
        let image = self.renderer.render(&qr.payload)?;
        let verification_hash = self.verifier.issue(&order_id, total, &qr.payload);
        let verification = NewPaymentVerification {
            order_id: order_id.clone(),
            expected_amount: total,
            qris_payload: qr.payload.clone(),
            verification_hash,
        };
        let order = order.with_qris(qr.payload.clone(), qr.expires_at);
        let allocation = self.db.allocate_order(order, verification).await?;
        info!(
            "🛒️ Order {order_id} for {buyer_id} checked out: {} units, {total}. QR valid until {}",
            allocation.accounts.len(),
            qr.expires_at
        );
        Ok(CheckoutResult {
            order: allocation.order,
            qr_payload: qr.payload,
            qr_image: image,
            qr_content_type: self.renderer.content_type().to_string(),
            expires_at: qr.expires_at,
        })
    }

    /// Handles the claim that `amount` has been paid for the order.
    ///
    /// The claim is checked against the stored verification record before anything changes. A claim that fails the
    /// check leaves the order pending, raises a [`ManipulationEvent`] for the admins, and returns
    /// [`StoreError::ManipulationDetected`], which carries no amounts. Confirming an order that is already paid is a
    /// no-op that returns [`PaymentOutcome::AlreadyPaid`].
    pub async fn confirm_payment(&self, order_id: &OrderId, amount: Rupiah) -> Result<PaymentOutcome, StoreError> {
        self.confirm_payment_at(order_id, amount, Utc::now()).await
    }

    pub async fn confirm_payment_at(
        &self,
        order_id: &OrderId,
        amount: Rupiah,
        now: DateTime<Utc>,
    ) -> Result<PaymentOutcome, StoreError> {
        let order = self.fetch_existing(order_id).await?;
        match order.status {
            PaymentStatus::Pending => {},
            PaymentStatus::Paid => {
                debug!("💰️ Order {order_id} is already paid. Ignoring the repeated confirmation");
                return Ok(PaymentOutcome::AlreadyPaid { order });
            },
            status => return Err(StoreError::InvalidStatus { order_id: order_id.clone(), status }),
        }
        if order.is_qr_expired_at(now) {
            info!("💰️ Payment claim for order {order_id} arrived after its QR expired. Expiring the order");
            let status = match self.expire_at(order_id, now).await? {
                TransitionResult::Transitioned(o) => o.status,
                TransitionResult::Rejected(o) if o.status == PaymentStatus::Paid => {
                    return Ok(PaymentOutcome::AlreadyPaid { order: o });
                },
                TransitionResult::Rejected(o) => o.status,
            };
            return Err(StoreError::InvalidStatus { order_id: order_id.clone(), status });
        }

        let verdict = match self.db.fetch_verification(order_id).await? {
            Some(record) => self.verifier.verify(amount, &record).map_err(|r| (r, record.expected_amount)),
            None => Err((ManipulationReason::MissingVerification, order.total_amount)),
        };
        if let Err((reason, expected_amount)) = verdict {
            warn!("🚨️ Payment claim for order {order_id} rejected: {reason}");
            let event = ManipulationEvent {
                order_id: order_id.clone(),
                expected_amount,
                received_amount: amount,
                buyer_id: order.buyer_id.clone(),
                reason,
            };
            self.producers.publish_manipulation(event).await;
            return Err(StoreError::ManipulationDetected(order_id.clone()));
        }

        match self.db.mark_paid(order_id, now).await? {
            TransitionResult::Transitioned(order) => {
                let sold_accounts = self.db.sold_accounts_for_order(order_id).await?;
                info!("💰️ Order {order_id} is paid. {} units released to {}", sold_accounts.len(), order.buyer_id);
                self.producers.publish_order_paid(OrderPaidEvent::new(order.clone(), sold_accounts.clone())).await;
                self.report_sale(&order, now).await?;
                Ok(PaymentOutcome::Confirmed { order, sold_accounts })
            },
            TransitionResult::Rejected(order) if order.status == PaymentStatus::Paid => {
                debug!("💰️ Order {order_id} was paid by a concurrent confirmation");
                Ok(PaymentOutcome::AlreadyPaid { order })
            },
            TransitionResult::Rejected(order) => {
                Err(StoreError::InvalidStatus { order_id: order_id.clone(), status: order.status })
            },
        }
    }

    /// Cancels a pending order and puts its units back in stock. Buyers may only cancel their own orders.
    pub async fn cancel(&self, order_id: &OrderId, requester: Requester) -> Result<Order, StoreError> {
        let order = self.fetch_existing(order_id).await?;
        if !requester.may_cancel(&order) {
            warn!("🛒️ {requester:?} tried to cancel order {order_id}, which belongs to someone else");
            return Err(StoreError::Forbidden(format!("Order {order_id} does not belong to you")));
        }
        match self.db.annul_order(order_id, PaymentStatus::Cancelled, Utc::now()).await? {
            TransitionResult::Transitioned(order) => {
                info!("🛒️ Order {order_id} cancelled by {requester:?}");
                self.producers.publish_order_annulled(OrderAnnulledEvent::new(&order)).await;
                Ok(order)
            },
            TransitionResult::Rejected(order) => {
                Err(StoreError::InvalidStatus { order_id: order_id.clone(), status: order.status })
            },
        }
    }

    /// Expires a single pending order. An order that is no longer pending is left alone and returned as
    /// [`TransitionResult::Rejected`].
    pub async fn expire(&self, order_id: &OrderId) -> Result<TransitionResult, StoreError> {
        self.expire_at(order_id, Utc::now()).await
    }

    pub async fn expire_at(&self, order_id: &OrderId, now: DateTime<Utc>) -> Result<TransitionResult, StoreError> {
        let result = self.db.annul_order(order_id, PaymentStatus::Expired, now).await?;
        match &result {
            TransitionResult::Transitioned(order) => {
                info!("⏰️ Order {order_id} expired. Its stock is back on sale");
                self.producers.publish_order_annulled(OrderAnnulledEvent::new(order)).await;
            },
            TransitionResult::Rejected(order) => {
                trace!("⏰️ Order {order_id} is {} and cannot expire", order.status);
            },
        }
        Ok(result)
    }

    /// The expiry sweep. Every pending order whose QR has expired is moved to `Expired` and its stock restored.
    /// A failure on one order does not stop the sweep; failures are collected in the result.
    pub async fn expire_old_orders(&self) -> Result<ExpiryResult, StoreError> {
        self.expire_old_orders_at(Utc::now()).await
    }

    pub async fn expire_old_orders_at(&self, now: DateTime<Utc>) -> Result<ExpiryResult, StoreError> {
        let candidates = self.db.fetch_expired_pending(now).await?;
        let mut result = ExpiryResult::default();
        for order in candidates {
            match self.expire_at(&order.order_id, now).await {
                Ok(TransitionResult::Transitioned(order)) => result.expired.push(order),
                Ok(TransitionResult::Rejected(_)) => {},
                Err(e) => {
                    error!("⏰️ Could not expire order {}: {e}", order.order_id);
                    result.failed.push((order.order_id, e.to_string()));
                },
            }
        }
        if !result.is_empty() {
            info!("⏰️ Expiry sweep: {} orders expired, {} failed", result.expired.len(), result.failed.len());
        }
        Ok(result)
    }

    /// Sends a sale report for every paid order the admins have not heard about yet. Returns the number of reports
    /// sent.
    pub async fn notify_unreported_sales(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let orders = self.db.fetch_unreported_paid().await?;
        let mut sent = 0;
        for order in orders {
            if self.report_sale(&order, now).await? {
                sent += 1;
            }
        }
        if sent > 0 {
            debug!("📣️ {sent} delayed sale reports sent");
        }
        Ok(sent)
    }

    /// Marks a paid order as refunded. The money itself moves outside the system, and the sold units stay sold.
    pub async fn refund(&self, order_id: &OrderId) -> Result<Order, StoreError> {
        match self.db.mark_refunded(order_id, Utc::now()).await? {
            TransitionResult::Transitioned(order) => {
                info!("💸️ Order {order_id} refunded");
                Ok(order)
            },
            TransitionResult::Rejected(order) => {
                Err(StoreError::InvalidStatus { order_id: order_id.clone(), status: order.status })
            },
        }
    }

    pub async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let order = self.db.fetch_order(order_id).await?;
        Ok(order)
    }

    pub async fn orders_for_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, StoreError> {
        let orders = self.db.fetch_orders_for_buyer(buyer_id).await?;
        Ok(orders)
    }

    async fn fetch_existing(&self, order_id: &OrderId) -> Result<Order, StoreError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))
    }

    /// Publishes the sale report for a paid order, at most once per order.
    async fn report_sale(&self, order: &Order, now: DateTime<Utc>) -> Result<bool, StoreError> {
        if !self.db.claim_admin_notification(&order.order_id, now).await? {
            trace!("📣️ Sale report for order {} was already sent", order.order_id);
            return Ok(false);
        }
        let sold_accounts = self.db.sold_accounts_for_order(&order.order_id).await?;
        self.producers.publish_sale_report(SaleReportEvent::new(order.clone(), sold_accounts)).await;
        Ok(true)
    }
}

/// Validates the cart and merges repeated products into a single quantity.
fn merge_cart(cart: &[CartLine]) -> Result<BTreeMap<i64, i64>, StoreError> {
    if cart.is_empty() {
        return Err(StoreError::InvalidCart("The cart is empty".into()));
    }
    let mut quantities = BTreeMap::new();
    for line in cart {
        if line.quantity <= 0 {
            return Err(StoreError::InvalidCart(format!(
                "Quantity for product #{} must be positive, not {}",
                line.product_id, line.quantity
            )));
        }
        let total = quantities.entry(line.product_id).or_insert(0i64);
        *total = total
            .checked_add(line.quantity)
            .ok_or_else(|| StoreError::InvalidCart(format!("Quantity for product #{} is too large", line.product_id)))?;
    }
    Ok(quantities)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn carts_are_merged_by_product() {
        let cart = [CartLine::new(2, 1), CartLine::new(1, 3), CartLine::new(2, 4)];
        let merged = merge_cart(&cart).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&1], 3);
        assert_eq!(merged[&2], 5);
    }

    #[test]
    fn invalid_carts() {
        assert!(matches!(merge_cart(&[]), Err(StoreError::InvalidCart(_))));
        assert!(matches!(merge_cart(&[CartLine::new(1, 0)]), Err(StoreError::InvalidCart(_))));
        assert!(matches!(merge_cart(&[CartLine::new(1, -2)]), Err(StoreError::InvalidCart(_))));
        assert!(matches!(
            merge_cart(&[CartLine::new(1, i64::MAX), CartLine::new(1, 1)]),
            Err(StoreError::InvalidCart(_))
        ));
    }
}
