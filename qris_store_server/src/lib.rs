//! # QRIS store server
//! The HTTP front of the QRIS store engine. It is responsible for:
//! * Taking checkouts, and handing back the payment QR for each order.
//! * Accepting payment confirmations from admins, and releasing the goods once a payment verifies.
//! * Managing the product catalogue and the stock of digital accounts.
//! * Running the background jobs: the order expiry sweep, delayed sale reports, and the daily stock report.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/checkout`: Creates an order for a cart and returns its dynamic QRIS code.
//! * `/payments/confirm`: Admin. Confirms that the amount for an order was received.
//! * `/orders/{order_id}`, `/orders/{order_id}/cancel`, `/orders/{order_id}/refund`, `/orders/{order_id}/accounts`
//! * `/products`, `/products/{product_id}/accounts`, `/stock`
//! * `/merchant`, `/merchant/qris`: The merchant profile, and the upload route that replaces it.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod notifications;
pub mod routes;
pub mod scheduler;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
