//! # Payment verification
//!
//! There is no payment gateway callback: "the buyer has paid" is an event raised inside the system, carrying the
//! amount the payer claims to have sent. Before an order is released, that claim is cross-checked three ways:
//!
//! 1. The stored verification record must still match its keyed integrity hash, so a record edited after checkout is
//!    caught.
//! 2. The amount embedded in the stored QR payload (tag 54) must equal the expected amount, so a payload rewritten
//!    after issuance is caught.
//! 3. The claimed amount must equal the expected amount.
//!
//! The integrity hash is an HMAC-SHA256 over `order_id:amount:payload`, hex encoded and truncated to
//! [`HASH_DISPLAY_LEN`] characters. It is deterministic for a given secret and input.
use std::fmt::{Debug, Display};

use hmac::{Hmac, Mac};
use log::*;
use qris_common::{Rupiah, Secret};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::{
    db_types::{OrderId, PaymentVerification},
    qris::{extract_field, tags, validate_payload, QrisError},
};

type HmacSha256 = Hmac<Sha256>;

/// Number of hex characters kept from the HMAC output
pub const HASH_DISPLAY_LEN: usize = 16;

#[derive(Debug, Clone, Error)]
pub enum VerifierError {
    #[error("The payment verification secret is empty")]
    EmptySecret,
    #[error("The payment verification secret cannot be used as an HMAC key")]
    InvalidKey,
}

/// Why a payment claim was rejected. Each check failing has its own reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManipulationReason {
    /// The stored verification record no longer matches its integrity hash
    HashMismatch,
    /// The amount embedded in the stored QR payload differs from the expected amount
    PayloadAmountMismatch,
    /// The claimed amount differs from the expected amount
    ClaimedAmountMismatch,
    /// There is no verification record for the order at all
    MissingVerification,
}

impl Display for ManipulationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ManipulationReason::HashMismatch => "verification record does not match its integrity hash",
            ManipulationReason::PayloadAmountMismatch => "QR payload amount does not match the expected amount",
            ManipulationReason::ClaimedAmountMismatch => "claimed amount does not match the expected amount",
            ManipulationReason::MissingVerification => "no verification record exists for the order",
        };
        f.write_str(s)
    }
}

#[derive(Clone)]
pub struct PaymentVerifier {
    key: HmacSha256,
}

impl Debug for PaymentVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentVerifier(****)")
    }
}

impl PaymentVerifier {
    pub fn new(secret: &Secret<String>) -> Result<Self, VerifierError> {
        if secret.is_empty() {
            return Err(VerifierError::EmptySecret);
        }
        let key = HmacSha256::new_from_slice(secret.reveal().as_bytes()).map_err(|_| VerifierError::InvalidKey)?;
        Ok(Self { key })
    }

    /// Computes the integrity hash binding `order_id`, `amount` and `payload` together.
    pub fn issue(&self, order_id: &OrderId, amount: Rupiah, payload: &str) -> String {
        let mac = self.keyed(order_id, amount, payload).finalize().into_bytes();
        let mut hash = hex::encode(mac);
        hash.truncate(HASH_DISPLAY_LEN);
        hash
    }

    /// Checks a payment claim of `claimed` against the stored verification record.
    pub fn verify(&self, claimed: Rupiah, record: &PaymentVerification) -> Result<(), ManipulationReason> {
        let PaymentVerification { order_id, expected_amount, qris_payload, verification_hash, .. } = record;
        if !self.hash_matches(order_id, *expected_amount, qris_payload, verification_hash) {
            warn!("🔐️ Verification record for order {order_id} fails its integrity check");
            return Err(ManipulationReason::HashMismatch);
        }
        let embedded = extract_field(qris_payload, tags::TRANSACTION_AMOUNT).and_then(|a| a.parse::<Rupiah>().ok());
        if embedded != Some(*expected_amount) {
            warn!("🔐️ QR payload for order {order_id} does not embed the expected amount");
            return Err(ManipulationReason::PayloadAmountMismatch);
        }
        if claimed != *expected_amount {
            warn!("🔐️ Payment claim for order {order_id} does not match the expected amount");
            return Err(ManipulationReason::ClaimedAmountMismatch);
        }
        trace!("🔐️ Payment claim for order {order_id} verified");
        Ok(())
    }

    /// Structural validation of a payload before it is trusted for anything else.
    pub fn check_integrity(&self, payload: &str) -> Result<(), QrisError> {
        validate_payload(payload)
    }

    fn keyed(&self, order_id: &OrderId, amount: Rupiah, payload: &str) -> HmacSha256 {
        let mut mac = self.key.clone();
        mac.update(format!("{}:{}:{payload}", order_id.as_str(), amount.value()).as_bytes());
        mac
    }

    fn hash_matches(&self, order_id: &OrderId, amount: Rupiah, payload: &str, hash: &str) -> bool {
        if hash.len() != HASH_DISPLAY_LEN {
            return false;
        }
        match hex::decode(hash.to_ascii_lowercase()) {
            Ok(tag) => self.keyed(order_id, amount, payload).verify_truncated_left(&tag).is_ok(),
            Err(_) => false,
        }
    }
}
