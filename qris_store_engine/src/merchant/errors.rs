use thiserror::Error;

use crate::qris::QrisError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerchantError {
    #[error("The uploaded image was rejected: {0}")]
    InvalidImage(String),
    #[error("The uploaded code is not a QRIS merchant code. {0}")]
    MalformedPayload(#[from] QrisError),
    #[error("Could not read the merchant details from the uploaded code: {0}")]
    ParseFailure(String),
    #[error("Could not save the merchant profile: {0}")]
    Storage(String),
}

impl From<std::io::Error> for MerchantError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for MerchantError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
