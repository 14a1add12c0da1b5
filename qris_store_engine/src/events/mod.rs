//! # Store events
//!
//! The engine reports what happens to orders through one-way notifications. Delivery of the goods, admin sale reports
//! and fraud alerts all hang off these hooks; the engine never waits on, or depends on, their success.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
