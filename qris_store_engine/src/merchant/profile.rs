use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    merchant::MerchantError,
    qris::{tags, validate_payload, MerchantFields, QrisError, TlvPayload},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantProfile {
    pub merchant_id: String,
    pub name: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub currency_code: String,
    /// The static QRIS payload, stored verbatim
    pub payload: String,
    pub uploaded_at: DateTime<Utc>,
}

impl MerchantProfile {
    /// Builds a profile from a decoded static QR payload.
    ///
    /// The payload must pass QRIS validation, parse cleanly field by field and end with its CRC field. At least one of
    /// the merchant name and city must be readable.
    pub fn from_payload(payload: &str, uploaded_at: DateTime<Utc>) -> Result<Self, MerchantError> {
        let payload = payload.trim();
        validate_payload(payload)?;
        let parsed = TlvPayload::parse(payload)?;
        if parsed.fields().last().map(|f| f.tag()) != Some(tags::CRC) {
            return Err(QrisError::MalformedPayload("The CRC field must come last".into()).into());
        }
        let fields = MerchantFields::from_payload(payload);
        if fields.name.is_none() && fields.city.is_none() {
            return Err(MerchantError::ParseFailure("Neither the merchant name nor the city could be read".into()));
        }
        let currency_code = fields.currency_or_default().to_string();
        let merchant_id = fields.merchant_id.unwrap_or_else(|| {
            warn!("🏪️ The uploaded QR code does not carry a merchant id.");
            String::default()
        });
        Ok(Self {
            merchant_id,
            name: fields.name,
            city: fields.city,
            country_code: fields.country_code,
            currency_code,
            payload: payload.to_string(),
            uploaded_at,
        })
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().or(self.city.as_deref()).unwrap_or("Unknown merchant")
    }
}
