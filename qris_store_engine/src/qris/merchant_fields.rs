use qris_common::IDR_NUMERIC_CODE;

use crate::qris::{extract_field, extract_nested_field, tags};

/// Merchant identity as read from a QRIS payload. Any field may be missing from a given payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerchantFields {
    pub merchant_id: Option<String>,
    pub name: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub currency_code: Option<String>,
}

impl MerchantFields {
    pub fn from_payload(payload: &str) -> Self {
        let non_empty = |v: String| {
            let v = v.trim().to_string();
            (!v.is_empty()).then_some(v)
        };
        Self {
            merchant_id: extract_nested_field(payload, tags::MERCHANT_ACCOUNT_INFO, tags::MERCHANT_ID)
                .and_then(non_empty),
            name: extract_field(payload, tags::MERCHANT_NAME).and_then(non_empty),
            city: extract_field(payload, tags::MERCHANT_CITY).and_then(non_empty),
            country_code: extract_field(payload, tags::COUNTRY_CODE).and_then(non_empty),
            currency_code: extract_field(payload, tags::TRANSACTION_CURRENCY).and_then(non_empty),
        }
    }

    pub fn currency_or_default(&self) -> &str {
        self.currency_code.as_deref().unwrap_or(IDR_NUMERIC_CODE)
    }
}
