use tokio::sync::mpsc;

/// Capacity used when nothing else is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Message body as delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// A message handed from the broker to an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Concrete topic the message was published on.
    pub destination: String,
    pub payload: Payload,
}

impl InboundMessage {
    pub fn new(destination: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            destination: destination.into(),
            payload: payload.into(),
        }
    }
}

/// Creates a bounded FIFO hand-off between broker delivery and the processing loop.
pub fn delivery_queue(capacity: usize) -> (DeliverySink, DeliveryQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (DeliverySink { tx }, DeliveryQueue { rx })
}

/// Producer side of the delivery queue. Cheap to clone, one per broker callback.
///
/// Enqueueing waits while the queue is full; messages are never dropped.
#[derive(Debug, Clone)]
pub struct DeliverySink {
    tx: mpsc::Sender<InboundMessage>,
}

impl DeliverySink {
    /// Waits for room, then enqueues. Returns the message back if the agent is gone.
    pub async fn enqueue(&self, message: InboundMessage) -> Result<(), InboundMessage> {
        self.tx.send(message).await.map_err(|e| e.0)
    }

    /// Blocking variant for broker threads that live outside the async runtime.
    ///
    /// Must not be called from within an async task.
    pub fn enqueue_blocking(&self, message: InboundMessage) -> Result<(), InboundMessage> {
        self.tx.blocking_send(message).map_err(|e| e.0)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the delivery queue, owned by the processing loop.
#[derive(Debug)]
pub struct DeliveryQueue {
    rx: mpsc::Receiver<InboundMessage>,
}

impl DeliveryQueue {
    /// Waits until a message is available.
    ///
    /// Returns `None` once every sink has been dropped and the queue is drained.
    pub async fn dequeue(&mut self) -> Option<InboundMessage> {
        self.rx.recv().await
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
