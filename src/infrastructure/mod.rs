//! Concrete implementations of the domain ports.

pub mod clock;
pub mod in_memory;
#[cfg(feature = "broker-mqtt")]
pub mod mqtt;
