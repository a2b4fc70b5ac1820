use crate::application::decoder;
use crate::application::handlers::{HandlerContext, PurchaseHandlerBox};
use crate::application::outbound::Outbound;
use crate::config::AgentOptions;
use crate::domain::delivery::{DeliveryQueue, InboundMessage, delivery_queue};
use crate::domain::destination::{Destination, TopicAddress};
use crate::domain::ledger::Ledger;
use crate::domain::ports::{BrokerBox, ClockBox};
use crate::error::{AgentError, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counters kept by the processing loop.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AgentStats {
    pub received: u64,
    pub processed: u64,
    pub malformed_payloads: u64,
    pub malformed_topics: u64,
    pub failed_sends: u64,
    pub other_errors: u64,
}

impl AgentStats {
    pub fn skipped(&self) -> u64 {
        self.malformed_payloads + self.malformed_topics + self.other_errors
    }
}

/// Final state of an agent once its processing loop has ended.
#[derive(Debug)]
pub struct AgentReport {
    pub handler: &'static str,
    pub ledger: Ledger,
    pub stats: AgentStats,
}

/// One agent: a purchase handler fed, one message at a time, from a delivery queue.
///
/// The runtime owns the ledger outright. Only the processing loop touches it,
/// so it is never shared or locked.
pub struct AgentRuntime {
    handler: PurchaseHandlerBox,
    outbound: Outbound,
    clock: ClockBox,
    ledger: Ledger,
    stats: AgentStats,
}

impl AgentRuntime {
    pub fn new(handler: PurchaseHandlerBox, outbound: Outbound, clock: ClockBox) -> Self {
        Self {
            handler,
            outbound,
            clock,
            ledger: Ledger::new(),
            stats: AgentStats::default(),
        }
    }

    /// Subscribes to `destination` and spawns the processing loop.
    ///
    /// Any failure to establish the subscription is a `Connection` error.
    pub async fn start(
        broker: BrokerBox,
        destination: &str,
        handler: PurchaseHandlerBox,
        clock: ClockBox,
        options: &AgentOptions,
    ) -> Result<RunningAgent> {
        let destination = Destination::parse(destination)?;
        let (sink, queue) = delivery_queue(options.queue_capacity);

        broker
            .subscribe(&destination, sink)
            .await
            .map_err(|e| match e {
                AgentError::Connection(_) => e,
                other => AgentError::Connection(other.to_string()),
            })?;
        info!(
            handler = handler.name(),
            %destination,
            mode = ?destination.delivery_mode(),
            "agent connected, awaiting purchase messages"
        );

        let outbound = Outbound::new(broker, options.notification_format);
        let runtime = AgentRuntime::new(handler, outbound, clock);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(runtime.process_loop(queue, shutdown.clone()));

        Ok(RunningAgent {
            destination,
            shutdown,
            task,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    /// Handles one delivery end to end and updates the counters.
    pub async fn process_message(&mut self, message: InboundMessage) -> Result<()> {
        self.stats.received += 1;
        let result = self.handle(message).await;
        match &result {
            Ok(()) => self.stats.processed += 1,
            Err(AgentError::MalformedPayload(_)) => self.stats.malformed_payloads += 1,
            Err(AgentError::MalformedTopic(_)) => self.stats.malformed_topics += 1,
            Err(AgentError::Delivery { .. } | AgentError::Encoding(_)) => {
                // the purchase itself was recorded and handled
                self.stats.processed += 1;
                self.stats.failed_sends += 1;
            }
            Err(_) => self.stats.other_errors += 1,
        }
        result
    }

    async fn handle(&mut self, message: InboundMessage) -> Result<()> {
        // segment 0 is the message type; this agent only receives purchases
        let address = TopicAddress::parse(&message.destination)?;
        let timestamp = self.clock.now_millis();
        let record = decoder::decode(
            &mut self.ledger,
            &message.payload,
            &address.client_id,
            &address.location,
            timestamp,
        )?
        .clone();

        let ctx = HandlerContext {
            ledger: &self.ledger,
            outbound: &self.outbound,
        };
        self.handler.on_purchase(&record, &ctx).await
    }

    /// Drains the queue until shutdown is requested or every producer is gone.
    ///
    /// A message that is already being handled always runs to completion;
    /// errors are logged and the loop moves on to the next message.
    pub async fn process_loop(
        mut self,
        mut queue: DeliveryQueue,
        shutdown: CancellationToken,
    ) -> AgentReport {
        info!(handler = self.handler.name(), "processing loop started");
        loop {
            let message = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!(pending = queue.len(), "shutdown requested");
                    break;
                }
                next = queue.dequeue() => match next {
                    Some(message) => message,
                    None => {
                        debug!("delivery queue closed");
                        break;
                    }
                },
            };

            debug!(destination = %message.destination, "processing message");
            if let Err(e) = self.process_message(message).await {
                if e.is_recoverable() {
                    warn!(error = %e, "message skipped");
                } else {
                    error!(error = %e, "failed to process message");
                }
            }
        }
        info!(
            handler = self.handler.name(),
            processed = self.stats.processed,
            skipped = self.stats.skipped(),
            "processing loop stopped"
        );
        self.into_report()
    }

    pub fn into_report(self) -> AgentReport {
        AgentReport {
            handler: self.handler.name(),
            ledger: self.ledger,
            stats: self.stats,
        }
    }
}

/// Handle to an agent whose processing loop is running in the background.
pub struct RunningAgent {
    destination: Destination,
    shutdown: CancellationToken,
    task: JoinHandle<AgentReport>,
}

impl RunningAgent {
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Token that stops the loop after the message in hand.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Requests shutdown and waits for the loop to finish.
    pub async fn stop(self) -> Result<AgentReport> {
        self.shutdown.cancel();
        self.wait().await
    }

    /// Waits for the loop to end on its own, which happens once the broker
    /// has dropped the subscription and the queue is drained.
    pub async fn wait(self) -> Result<AgentReport> {
        self.task
            .await
            .map_err(|e| AgentError::TaskFailed(e.to_string()))
    }
}
