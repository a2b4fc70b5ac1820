use super::delivery::{DeliverySink, Payload};
use super::destination::Destination;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Publish/subscribe connection used by an agent.
///
/// Deliveries for a subscription are pushed into the given sink, possibly
/// from a context the agent does not control.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn subscribe(&self, destination: &Destination, sink: DeliverySink) -> Result<()>;
    async fn publish(&self, topic: &str, payload: Payload) -> Result<()>;
    /// Drops every subscription sink so consumers can drain and stop.
    async fn close(&self) -> Result<()>;
}

/// Source of receipt timestamps, in milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub type BrokerBox = Arc<dyn Broker>;
pub type ClockBox = Arc<dyn Clock>;
