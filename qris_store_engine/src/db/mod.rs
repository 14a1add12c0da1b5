//! # Database management and control
//!
//! The engine talks to storage through the traits in [`traits`]. A backend implements
//! * [`traits::InventoryManagement`] for products, their pool of digital accounts, and stock queries, and
//! * [`traits::OrderManagement`] for the order lifecycle, including the atomic stock allocation that accompanies every
//!   new order.
//!
//! SQLite is the only backend at present.
mod errors;

pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use errors::DatabaseError;
