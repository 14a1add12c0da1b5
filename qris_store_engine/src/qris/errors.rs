use qris_common::Rupiah;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QrisError {
    #[error("Malformed QRIS payload: {0}")]
    MalformedPayload(String),
    #[error("Field {tag} has {len} characters, but a TLV value holds at most 99")]
    FieldTooLong { tag: String, len: usize },
    #[error("Invalid TLV tag '{0}'. Tags are two decimal digits")]
    InvalidTag(String),
    #[error("No static merchant QRIS has been uploaded yet")]
    NotConfigured,
    #[error("Dynamic QR amounts must be positive, not {0}")]
    InvalidAmount(Rupiah),
    #[error("A dynamic QR must be bound to a non-empty order id")]
    MissingOrderId,
}
