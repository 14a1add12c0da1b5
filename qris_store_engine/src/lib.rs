//! QRIS Store Engine
//!
//! The QRIS Store Engine sells digital goods (streaming accounts, licence codes, links) and takes payment through
//! Indonesia's QRIS standard. Every order gets its own dynamic QR carrying the exact amount due, derived from the
//! merchant's static QRIS code. This library contains the core logic. It knows nothing about chat bots or HTTP.
//!
//! The library is divided into these sections:
//! 1. The QRIS codec ([`mod@qris`]): TLV parsing and editing, CRC sealing, and dynamic QR generation and rendering.
//! 2. The merchant profile ([`mod@merchant`]): the uploaded static QRIS code that every payment QR is derived from.
//! 3. Database management ([`mod@db`]). SQLite is the supported backend. You should never need to access the database
//!    directly. Use the public API instead. The data types stored in the database are public, in [`mod@db_types`].
//! 4. Payment verification ([`mod@verification`]): the keyed integrity check run before any order is released.
//! 5. The public API ([`mod@store_api`]): checkout, payment confirmation, cancellation, expiry, refunds, inventory and
//!    merchant management.
//!
//! The engine emits events when orders are paid, reported to the admins, expired or cancelled, when a payment claim
//! looks manipulated, and when stock runs low. A simple actor framework in [`mod@events`] lets you hook into them.
mod db;

pub mod db_types;
pub mod events;
pub mod merchant;
pub mod qris;
pub mod store_api;
pub mod verification;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::{
    traits::{AllocationResult, ExpiryResult, InventoryManagement, OrderManagement, TransitionResult},
    DatabaseError,
};
pub use store_api::{
    errors::StoreError,
    inventory_api::InventoryApi,
    merchant_api::MerchantApi,
    order_flow_api::OrderFlowApi,
    order_objects,
};
pub use verification::{PaymentVerifier, VerifierError};
