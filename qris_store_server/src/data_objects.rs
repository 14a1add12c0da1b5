use std::fmt::Display;

use chrono::{DateTime, Utc};
use qris_common::Rupiah;
use qris_store_engine::{
    db_types::{ContentKind, Order, OrderId},
    merchant::MerchantProfile,
    order_objects::{CartLine, CheckoutResult},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub buyer_id: String,
    pub items: Vec<CartLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order: Order,
    pub qr_payload: String,
    /// The rendered QR image, base64 encoded
    pub qr_image: String,
    pub qr_content_type: String,
    pub expires_at: DateTime<Utc>,
}

impl From<CheckoutResult> for CheckoutResponse {
    fn from(result: CheckoutResult) -> Self {
        Self {
            qr_image: base64::encode(&result.qr_image),
            order: result.order,
            qr_payload: result.qr_payload,
            qr_content_type: result.qr_content_type,
            expires_at: result.expires_at,
        }
    }
}

/// The claim that `amount` was received for an order. Amounts are whole rupiah.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub order_id: OrderId,
    pub amount: Rupiah,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelRequest {
    /// Required unless the caller is an admin
    #[serde(default)]
    pub buyer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantStatus {
    pub configured: bool,
    pub profile: Option<MerchantProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Rupiah,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountContent {
    pub content: String,
    #[serde(default)]
    pub content_kind: ContentKind,
}
