//! # Merchant profile
//!
//! A deployment sells on behalf of exactly one merchant, identified by the merchant's static QRIS code. An admin
//! uploads a picture of that code; the decoded payload, together with the merchant fields read from it, becomes the
//! active [`MerchantProfile`]. Every dynamic QR is derived from the active profile's payload.
//!
//! The active profile lives in a [`MerchantProfileStore`]. The store is cheap to clone and every clone shares the same
//! profile, so it is handed to whichever component needs it rather than being kept in a global.
mod decoder;
mod errors;
mod profile;
mod store;

pub use decoder::{QrImageDecoder, TextPayloadDecoder};
pub use errors::MerchantError;
pub use profile::MerchantProfile;
pub use store::{MerchantProfileStore, DEFAULT_MAX_UPLOAD_BYTES};
