//! Behaviour a storage backend must provide to support the store engine.
//!
//! * [`InventoryManagement`] covers the product catalogue and the pool of digital accounts behind each product.
//! * [`OrderManagement`] covers the order lifecycle. Every status change is a compare-and-set on the current status,
//!   so two racing transitions on one order can never both succeed.
mod data_objects;
mod inventory_management;
mod order_management;

pub use data_objects::{AllocationResult, ExpiryResult, TransitionResult};
pub use inventory_management::InventoryManagement;
pub use order_management::OrderManagement;
