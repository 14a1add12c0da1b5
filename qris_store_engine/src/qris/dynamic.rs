//! Dynamic QR generation.
//!
//! A merchant's static QR identifies the merchant only. To take a payment for a specific order, it is rewritten into
//! a dynamic QR:
//!
//! 1. the point of initiation (tag 01) becomes `12` (dynamic),
//! 2. the transaction amount (tag 54) is set,
//! 3. the additional data template (tag 62) gets a bill number (the order id) and a reference label,
//! 4. the CRC (tag 63) is recomputed over the result. This must happen last.
//!
//! The dynamic QR is only honoured for a short, fixed window after generation.
use chrono::{DateTime, Duration, Utc};
use log::*;
use qris_common::Rupiah;

use crate::{
    db_types::OrderId,
    merchant::MerchantProfileStore,
    qris::{tags, QrisError, TlvPayload, DYNAMIC_INITIATION},
};

pub const DEFAULT_QR_VALIDITY_SECS: i64 = 300;
pub const MAX_BILL_NUMBER_LEN: usize = 25;
pub const REFERENCE_PREFIX_LEN: usize = 8;
const REFERENCE_TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S";

/// A single-use payment QR bound to one order and amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicQr {
    pub order_id: OrderId,
    pub amount: Rupiah,
    pub payload: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DynamicQr {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub fn default_qr_validity() -> Duration {
    Duration::seconds(DEFAULT_QR_VALIDITY_SECS)
}

/// Produces dynamic QRs from the merchant profile that is active at the time of the call.
#[derive(Debug, Clone)]
pub struct DynamicQrGenerator {
    profiles: MerchantProfileStore,
    validity: Duration,
}

impl DynamicQrGenerator {
    pub fn new(profiles: MerchantProfileStore, validity: Duration) -> Self {
        Self { profiles, validity }
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    pub fn profiles(&self) -> &MerchantProfileStore {
        &self.profiles
    }

    pub fn generate(&self, amount: Rupiah, order_id: &OrderId) -> Result<DynamicQr, QrisError> {
        self.generate_at(amount, order_id, Utc::now())
    }

    pub fn generate_at(&self, amount: Rupiah, order_id: &OrderId, now: DateTime<Utc>) -> Result<DynamicQr, QrisError> {
        let profile = self.profiles.current().ok_or(QrisError::NotConfigured)?;
        let payload = dynamic_payload(&profile.payload, amount, order_id.as_str(), now)?;
        let expires_at = now + self.validity;
        debug!("🔳️ Dynamic QR for order {order_id} ({amount}) generated. Valid until {expires_at}");
        Ok(DynamicQr { order_id: order_id.clone(), amount, payload, generated_at: now, expires_at })
    }
}

/// Rewrites `static_payload` into a dynamic payload for `amount`, bound to `order_id`.
///
/// Sub-fields of an existing additional data template (e.g. a terminal label) are kept; the bill number and reference
/// label are overwritten.
pub fn dynamic_payload(
    static_payload: &str,
    amount: Rupiah,
    order_id: &str,
    now: DateTime<Utc>,
) -> Result<String, QrisError> {
    if !amount.is_positive() {
        return Err(QrisError::InvalidAmount(amount));
    }
    let order_id = order_id.trim();
    if order_id.is_empty() {
        return Err(QrisError::MissingOrderId);
    }
    let mut tlv = TlvPayload::parse(static_payload)?;
    tlv.set(tags::POINT_OF_INITIATION, DYNAMIC_INITIATION)?;
    tlv.set(tags::TRANSACTION_AMOUNT, amount.to_decimal_string())?;

    let mut additional = tlv.nested(tags::ADDITIONAL_DATA)?.unwrap_or_default();
    additional.set(tags::BILL_NUMBER, bill_number(order_id))?;
    additional.set(tags::REFERENCE_LABEL, reference_label(order_id, now))?;
    tlv.set(tags::ADDITIONAL_DATA, additional.to_string())?;

    Ok(tlv.to_sealed_string())
}

pub fn bill_number(order_id: &str) -> String {
    order_id.chars().take(MAX_BILL_NUMBER_LEN).collect()
}

pub fn reference_label(order_id: &str, now: DateTime<Utc>) -> String {
    let prefix = order_id.chars().take(REFERENCE_PREFIX_LEN).collect::<String>();
    format!("{prefix}-{}", now.format(REFERENCE_TIMESTAMP_FORMAT))
}
