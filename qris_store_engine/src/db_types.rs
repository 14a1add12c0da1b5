use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use qris_common::Rupiah;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh order id of the form `ORD-1a2b3c4d-65F41A2D`: 8 hex characters of a random v4 uuid and the
    /// current unix time in upper-case hex.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("ORD-{}-{:X}", &random[..8], now.timestamp()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("An order id cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// The order has been created, stock is reserved, and we are waiting for the buyer to pay.
    Pending,
    /// Payment has been verified and the goods delivered.
    Paid,
    /// The dynamic QR lapsed before payment was received. Stock has been returned.
    Expired,
    /// The buyer or an admin cancelled the order before payment. Stock has been returned.
    Cancelled,
    /// A paid order was refunded by hand.
    Refunded,
}

impl PaymentStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }

    /// True for expired and cancelled orders, i.e. orders whose stock went back on the shelf.
    pub fn is_annulled(&self) -> bool {
        matches!(self, PaymentStatus::Expired | PaymentStatus::Cancelled)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------      ContentKind      ---------------------------------------------------------
/// What the content of a digital account represents. This only affects how it is presented to the buyer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Login credentials, conventionally `email|password`
    #[default]
    Account,
    /// A redemption or invitation link
    Link,
    /// A voucher or redeem code
    Code,
    /// Free-form text
    Custom,
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContentKind::Account => "account",
            ContentKind::Link => "link",
            ContentKind::Code => "code",
            ContentKind::Custom => "custom",
        };
        f.write_str(s)
    }
}

impl FromStr for ContentKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "account" => Ok(Self::Account),
            "link" => Ok(Self::Link),
            "code" => Ok(Self::Code),
            "custom" => Ok(Self::Custom),
            s => Err(ConversionError(format!("Invalid content kind: {s}"))),
        }
    }
}

//--------------------------------------        Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Rupiah,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Rupiah,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, price: Rupiah) -> Self {
        Self { name: name.into(), description: None, price }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

//--------------------------------------     DigitalAccount    ---------------------------------------------------------
/// One sellable unit of inventory. Once `sold` is set, the unit belongs to `sold_order_id` and is never handed to
/// anyone else.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DigitalAccount {
    pub id: i64,
    pub product_id: i64,
    pub content: String,
    pub content_kind: ContentKind,
    pub sold: bool,
    pub sold_order_id: Option<OrderId>,
    pub sold_to: Option<String>,
    pub sold_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDigitalAccount {
    pub product_id: i64,
    pub content: String,
    #[serde(default)]
    pub content_kind: ContentKind,
}

impl NewDigitalAccount {
    pub fn new<S: Into<String>>(product_id: i64, content: S, content_kind: ContentKind) -> Self {
        Self { product_id, content: content.into(), content_kind }
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub buyer_id: String,
    pub total_amount: Rupiah,
    pub status: PaymentStatus,
    pub qris_payload: Option<String>,
    pub qris_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub admin_notified_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub lines: Vec<OrderLine>,
}

impl Order {
    pub fn is_qr_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.qris_expiry.map(|t| now >= t).unwrap_or(false)
    }

    pub fn total_units(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Rupiah,
}

impl OrderLine {
    pub fn subtotal(&self) -> Option<Rupiah> {
        self.unit_price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    /// The product price at checkout time
    pub unit_price: Rupiah,
}

impl NewOrderLine {
    /// `None` if the subtotal does not fit in a [`Rupiah`]
    pub fn subtotal(&self) -> Option<Rupiah> {
        self.unit_price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub buyer_id: String,
    pub lines: Vec<NewOrderLine>,
    pub qris_payload: Option<String>,
    pub qris_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new<S: Into<String>>(order_id: OrderId, buyer_id: S, lines: Vec<NewOrderLine>) -> Self {
        Self {
            order_id,
            buyer_id: buyer_id.into(),
            lines,
            qris_payload: None,
            qris_expiry: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_qris(mut self, payload: String, expiry: DateTime<Utc>) -> Self {
        self.qris_payload = Some(payload);
        self.qris_expiry = Some(expiry);
        self
    }

    /// The order total is always derived from the lines, never supplied separately. `None` if it overflows.
    pub fn total_amount(&self) -> Option<Rupiah> {
        self.lines.iter().try_fold(Rupiah::default(), |total, line| total.checked_add(line.subtotal()?))
    }

    /// Requested quantity per product, with repeated products merged.
    pub fn quantities(&self) -> BTreeMap<i64, i64> {
        self.lines.iter().fold(BTreeMap::new(), |mut acc, line| {
            *acc.entry(line.product_id).or_default() += line.quantity;
            acc
        })
    }
}

//--------------------------------------   SoldAccountRecord   ---------------------------------------------------------
/// The delivery record for one allocated unit: what was sold, to whom, in which order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SoldAccountRecord {
    pub id: i64,
    pub account_id: i64,
    pub order_id: OrderId,
    pub buyer_id: String,
    pub product_id: i64,
    pub product_name: String,
    pub content: String,
    pub content_kind: ContentKind,
    pub sold_at: DateTime<Utc>,
}

//--------------------------------------  PaymentVerification  ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentVerification {
    pub id: i64,
    pub order_id: OrderId,
    pub expected_amount: Rupiah,
    pub qris_payload: String,
    pub verification_hash: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaymentVerification {
    pub order_id: OrderId,
    pub expected_amount: Rupiah,
    pub qris_payload: String,
    pub verification_hash: String,
}

//--------------------------------------      Stock levels     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: i64,
    pub name: String,
    pub price: Rupiah,
    pub available: i64,
    pub sold: i64,
    pub total: i64,
}

impl StockLevel {
    pub fn is_out_of_stock(&self) -> bool {
        self.available <= 0
    }

    pub fn is_low(&self, threshold: i64) -> bool {
        self.available > 0 && self.available <= threshold
    }
}

/// A cart line that cannot be filled from current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfall {
    pub product_id: i64,
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
}

impl StockShortfall {
    pub fn missing(&self) -> i64 {
        self.requested - self.available
    }
}

impl Display for StockShortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: requested {}, only {} available ({} short)",
            self.product_name,
            self.requested,
            self.available,
            self.missing()
        )
    }
}
