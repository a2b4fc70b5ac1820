use crate::config::BrokerConfig;
use crate::domain::delivery::{DeliverySink, InboundMessage, Payload};
use crate::domain::destination::{DeliveryMode, Destination, topic_matches};
use crate::domain::ports::Broker;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type SinkTable = Arc<RwLock<Vec<(String, DeliverySink)>>>;

/// Broker adapter speaking MQTT through `rumqttc`.
///
/// Topic destinations are subscribed at QoS 0 on a clean session. Queue
/// destinations use QoS 1 on a persistent session so the broker keeps
/// messages while the agent is away.
#[derive(Clone)]
pub struct MqttBroker {
    client: AsyncClient,
    namespace: Option<String>,
    sinks: SinkTable,
    pump: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl MqttBroker {
    /// Connects and waits for the broker to accept the session.
    pub async fn connect(config: &BrokerConfig, mode: DeliveryMode) -> Result<Self> {
        config.validate()?;

        let mut options = MqttOptions::new(&config.client_name, config.host(), config.port());
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
        options.set_clean_session(mode == DeliveryMode::Direct);
        if let Some(user) = &config.username {
            options.set_credentials(user, config.password.as_deref().unwrap_or_default());
        }
        if config.use_tls() {
            options.set_transport(Transport::tls_with_default_config());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        let timeout = Duration::from_secs(config.connect_timeout_secs.max(1));
        tokio::time::timeout(timeout, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| {
                AgentError::Connection(format!(
                    "no answer from {} within {}s",
                    config.url, config.connect_timeout_secs
                ))
            })??;
        info!(url = %config.url, client = %config.client_name, "connected to broker");

        let namespace = config.vpn.clone().filter(|v| !v.is_empty());
        let sinks: SinkTable = Arc::default();
        let pump = tokio::spawn(pump_deliveries(eventloop, sinks.clone(), namespace.clone()));

        Ok(Self {
            client,
            namespace,
            sinks,
            pump: Arc::new(Mutex::new(Some(pump))),
        })
    }

    fn scoped(&self, topic: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{topic}"),
            None => topic.to_string(),
        }
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(_) => continue,
            Err(e) => return Err(AgentError::Connection(e.to_string())),
        }
    }
}

/// Drives the MQTT event loop and routes publishes into the matching sinks.
///
/// Waiting on a full sink stalls the event loop, which pushes back on the
/// broker through the transport's own flow control. While it is stalled the
/// loop also stops draining the client's request channel, so `publish` uses
/// `try_publish` and reports a full channel as a failed send instead of
/// waiting on a loop that may be waiting on the agent.
async fn pump_deliveries(mut eventloop: EventLoop, sinks: SinkTable, namespace: Option<String>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let topic = match &namespace {
                    Some(ns) => match publish.topic.strip_prefix(&format!("{ns}/")) {
                        Some(rest) => rest.to_string(),
                        None => continue,
                    },
                    None => publish.topic.clone(),
                };
                debug!(%topic, bytes = publish.payload.len(), "message received");

                let targets: Vec<DeliverySink> = sinks
                    .read()
                    .await
                    .iter()
                    .filter(|(filter, _)| topic_matches(filter, &topic))
                    .map(|(_, sink)| sink.clone())
                    .collect();
                for sink in targets {
                    let message =
                        InboundMessage::new(topic.clone(), Payload::Bytes(publish.payload.to_vec()));
                    if sink.enqueue(message).await.is_err() {
                        warn!(%topic, "agent queue closed, message dropped");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                // rumqttc reconnects on the next poll
                warn!("broker connection error: {e}");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Translates `*` / `>` wildcards into their MQTT spelling.
fn to_mqtt_filter(filter: &str) -> String {
    filter
        .split('/')
        .map(|level| match level {
            "*" => "+",
            ">" => "#",
            other => other,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl Broker for MqttBroker {
    async fn subscribe(&self, destination: &Destination, sink: DeliverySink) -> Result<()> {
        let filter = to_mqtt_filter(destination.name());
        let qos = match destination.delivery_mode() {
            DeliveryMode::Direct => QoS::AtMostOnce,
            DeliveryMode::Guaranteed => QoS::AtLeastOnce,
        };
        self.sinks.write().await.push((filter.clone(), sink));
        self.client
            .subscribe(self.scoped(&filter), qos)
            .await
            .map_err(|e| AgentError::Connection(format!("subscribe to {destination} failed: {e}")))?;
        info!(%destination, ?qos, "subscribed");
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Payload) -> Result<()> {
        let bytes = match payload {
            Payload::Text(text) => text.into_bytes(),
            Payload::Bytes(bytes) => bytes,
        };
        self.client
            .try_publish(self.scoped(topic), QoS::AtMostOnce, false, bytes)
            .map_err(|e| AgentError::delivery(topic, e))
    }

    async fn close(&self) -> Result<()> {
        self.sinks.write().await.clear();
        if let Err(e) = self.client.disconnect().await {
            debug!("disconnect request failed: {e}");
        }
        if let Some(pump) = self.pump.lock().await.take() {
            pump.abort();
        }
        Ok(())
    }
}
