use crate::domain::delivery::{DeliverySink, InboundMessage, Payload};
use crate::domain::destination::{Destination, topic_matches};
use crate::domain::ports::Broker;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A message as it was handed to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Payload,
}

impl PublishedMessage {
    /// Payload as text, lossily decoded when it was sent as bytes.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.payload.as_bytes()).into_owned()
    }
}

struct Subscription {
    destination: Destination,
    sink: DeliverySink,
}

#[derive(Default)]
struct BrokerState {
    subscriptions: Vec<Subscription>,
    /// Queue name -> topic filters whose messages the queue attracts.
    queue_bindings: HashMap<String, Vec<String>>,
    closed: bool,
}

impl BrokerState {
    fn sinks_for(&self, topic: &str) -> Vec<DeliverySink> {
        self.subscriptions
            .iter()
            .filter(|s| match &s.destination {
                Destination::Topic(filter) => topic_matches(filter, topic),
                Destination::Queue(name) => {
                    name == topic
                        || self
                            .queue_bindings
                            .get(name)
                            .is_some_and(|filters| filters.iter().any(|f| topic_matches(f, topic)))
                }
            })
            .map(|s| s.sink.clone())
            .collect()
    }
}

/// An in-process publish/subscribe broker.
///
/// Every published message is also kept in a log so tests and the simulator
/// can inspect what agents sent. Clones share the same broker.
#[derive(Default, Clone)]
pub struct InMemoryBroker {
    state: Arc<RwLock<BrokerState>>,
    published: Arc<RwLock<Vec<PublishedMessage>>>,
    fail_publishes: Arc<AtomicBool>,
    offline: Arc<AtomicBool>,
}

impl InMemoryBroker {
    /// Creates a new, empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// A broker that refuses every subscription, for exercising startup failures.
    pub fn offline() -> Self {
        let broker = Self::default();
        broker.offline.store(true, Ordering::Release);
        broker
    }

    /// Makes a queue attract messages published on topics matching `filter`.
    pub async fn bind_queue(&self, queue: &str, filter: &str) {
        let mut state = self.state.write().await;
        state
            .queue_bindings
            .entry(queue.to_string())
            .or_default()
            .push(filter.to_string());
    }

    /// When set, every publish fails with a delivery error.
    pub fn set_fail_publishes(&self, fail: bool) {
        self.fail_publishes.store(fail, Ordering::Release);
    }

    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.published.read().await.clone()
    }

    /// Published messages whose topic starts with `prefix`.
    pub async fn published_on(&self, prefix: &str) -> Vec<PublishedMessage> {
        self.published
            .read()
            .await
            .iter()
            .filter(|m| m.topic.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub async fn subscription_count(&self) -> usize {
        self.state.read().await.subscriptions.len()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn subscribe(&self, destination: &Destination, sink: DeliverySink) -> Result<()> {
        if self.offline.load(Ordering::Acquire) {
            return Err(AgentError::Connection("in-memory broker is offline".into()));
        }
        let mut state = self.state.write().await;
        if state.closed {
            return Err(AgentError::Connection("in-memory broker is closed".into()));
        }
        debug!(%destination, "adding subscription");
        state.subscriptions.push(Subscription {
            destination: destination.clone(),
            sink,
        });
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Payload) -> Result<()> {
        if self.fail_publishes.load(Ordering::Acquire) {
            return Err(AgentError::delivery(topic, "publishing is disabled"));
        }
        self.published.write().await.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.clone(),
        });

        // Collect sinks first so the lock is not held while waiting on a full queue.
        let sinks = self.state.read().await.sinks_for(topic);
        for sink in sinks {
            if sink
                .enqueue(InboundMessage::new(topic, payload.clone()))
                .await
                .is_err()
            {
                warn!(topic, "subscriber went away, message not delivered");
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.closed = true;
        state.subscriptions.clear();
        Ok(())
    }
}
