//! Application layer: the agent runtime and everything it drives.
//!
//! An agent subscribes through a [`Broker`](crate::domain::ports::Broker),
//! receives deliveries on a bounded queue and runs a single
//! [`PurchaseHandler`](handlers::PurchaseHandler) for each decoded purchase on
//! its own processing task.

pub mod agent;
pub mod client;
pub mod decoder;
pub mod handlers;
pub mod outbound;
