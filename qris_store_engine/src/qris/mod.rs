//! # QRIS payload codec
//!
//! QRIS is Indonesia's profile of the EMV QR Code merchant-presented format. A payload is a flat string of
//! tag-length-value fields (`tag` = 2 digits, `length` = 2 digits, then `length` characters of value). Some fields,
//! notably the merchant account information (tag 26) and the additional data template (tag 62), carry a nested
//! payload of the same shape as their value. The payload always ends with the CRC field (tag 63).
//!
//! * [`tlv`] parses payloads into a list of fields, lets you edit them and re-serializes them byte-for-byte.
//! * [`crc`] implements the CRC-16/CCITT-FALSE checksum that seals every payload.
//! * [`dynamic`] turns a merchant's static QR into a single-use, amount-bound dynamic QR.
//! * [`render`] renders a payload as a scannable image.
mod errors;
mod merchant_fields;

pub mod crc;
pub mod dynamic;
pub mod render;
pub mod tlv;

pub use crc::{compute_crc16, seal_payload, verify_crc};
pub use dynamic::{default_qr_validity, DynamicQr, DynamicQrGenerator, DEFAULT_QR_VALIDITY_SECS};
pub use errors::QrisError;
pub use merchant_fields::MerchantFields;
pub use render::{QrImageRenderer, QrRenderError, SvgQrRenderer};
pub use tlv::{extract_field, extract_nested_field, replace_field, TlvField, TlvPayload};

/// Well-known top-level and nested tags used by this crate.
pub mod tags {
    pub const PAYLOAD_FORMAT_INDICATOR: &str = "00";
    pub const POINT_OF_INITIATION: &str = "01";
    pub const MERCHANT_ACCOUNT_INFO: &str = "26";
    pub const MERCHANT_CATEGORY_CODE: &str = "52";
    pub const TRANSACTION_CURRENCY: &str = "53";
    pub const TRANSACTION_AMOUNT: &str = "54";
    pub const COUNTRY_CODE: &str = "58";
    pub const MERCHANT_NAME: &str = "59";
    pub const MERCHANT_CITY: &str = "60";
    pub const ADDITIONAL_DATA: &str = "62";
    pub const CRC: &str = "63";

    /// Merchant id, nested inside [`MERCHANT_ACCOUNT_INFO`]
    pub const MERCHANT_ID: &str = "01";
    /// Bill number, nested inside [`ADDITIONAL_DATA`]
    pub const BILL_NUMBER: &str = "01";
    /// Reference label, nested inside [`ADDITIONAL_DATA`]
    pub const REFERENCE_LABEL: &str = "05";
}

pub const PAYLOAD_FORMAT_VERSION: &str = "01";
pub const STATIC_INITIATION: &str = "11";
pub const DYNAMIC_INITIATION: &str = "12";
pub const QRIS_GLOBAL_ID: &str = "ID.CO.QRIS.WWW";
pub const MIN_PAYLOAD_LEN: usize = 50;

/// Structural validation of a QRIS payload.
///
/// A payload is accepted iff it is at least [`MIN_PAYLOAD_LEN`] characters long, its payload format indicator is
/// `01`, its point of initiation is static (`11`) or dynamic (`12`), and its merchant account information contains
/// the QRIS global identifier.
pub fn validate_payload(payload: &str) -> Result<(), QrisError> {
    let len = payload.chars().count();
    if len < MIN_PAYLOAD_LEN {
        return Err(QrisError::MalformedPayload(format!(
            "payload is {len} characters long, at least {MIN_PAYLOAD_LEN} are required"
        )));
    }
    match extract_field(payload, tags::PAYLOAD_FORMAT_INDICATOR) {
        Some(v) if v == PAYLOAD_FORMAT_VERSION => {},
        Some(v) => return Err(QrisError::MalformedPayload(format!("unsupported payload format indicator '{v}'"))),
        None => return Err(QrisError::MalformedPayload("payload format indicator is missing".into())),
    }
    match extract_field(payload, tags::POINT_OF_INITIATION).as_deref() {
        Some(STATIC_INITIATION | DYNAMIC_INITIATION) => {},
        Some(v) => return Err(QrisError::MalformedPayload(format!("unknown point of initiation '{v}'"))),
        None => return Err(QrisError::MalformedPayload("point of initiation is missing".into())),
    }
    let account_info = extract_field(payload, tags::MERCHANT_ACCOUNT_INFO)
        .ok_or_else(|| QrisError::MalformedPayload("merchant account information is missing".into()))?;
    if !account_info.contains(QRIS_GLOBAL_ID) {
        return Err(QrisError::MalformedPayload("merchant account information is not a QRIS account".into()));
    }
    Ok(())
}
