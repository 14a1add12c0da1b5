//! # Store engine public API
//!
//! The `store_api` module exposes the programmatic API of the store engine. It is what a transport (chat bot, HTTP
//! server, admin CLI) talks to.
//!
//! * [`order_flow_api`] drives orders from checkout to payment, cancellation or expiry.
//! * [`inventory_api`] manages products and their pool of digital accounts, and reports on stock.
//! * [`merchant_api`] manages the merchant QRIS code that every payment QR is derived from.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits required by the API.
//!
//! ```rust,ignore
//! use qris_store_engine::{events::EventProducers, InventoryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/qris_store.db", 5).await?;
//! // SqliteDatabase implements InventoryManagement
//! let api = InventoryApi::new(db, EventProducers::default());
//! let stock = api.stock_summary().await?;
//! ```
pub mod errors;
pub mod inventory_api;
pub mod merchant_api;
pub mod order_flow_api;
pub mod order_objects;
