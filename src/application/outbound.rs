use crate::config::NotificationFormat;
use crate::domain::delivery::Payload;
use crate::domain::ports::BrokerBox;
use crate::domain::purchase::PurchaseRecord;
use crate::error::Result;
use crate::interfaces::json::purchase_codec;
use tracing::info;

/// The agent's capability to send messages, bound to its broker session.
#[derive(Clone)]
pub struct Outbound {
    broker: BrokerBox,
    format: NotificationFormat,
}

impl Outbound {
    pub fn new(broker: BrokerBox, format: NotificationFormat) -> Self {
        Self { broker, format }
    }

    pub fn format(&self) -> NotificationFormat {
        self.format
    }

    /// Publishes `text` on `topic`. No retries.
    pub async fn send(&self, text: &str, topic: &str) -> Result<()> {
        self.broker.publish(topic, Payload::Text(text.to_string())).await?;
        info!(topic, "notification sent");
        Ok(())
    }

    /// Sends a notification about `record`, rendered per the configured format.
    pub async fn send_notification(
        &self,
        record: &PurchaseRecord,
        text: &str,
        topic: &str,
    ) -> Result<()> {
        match self.format {
            NotificationFormat::Text => self.send(text, topic).await,
            NotificationFormat::Json => {
                let echo = purchase_codec::encode_record(&record.with_message(text), true)?;
                self.send(&echo, topic).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::purchase::{Money, ProductPurchase};
    use crate::error::AgentError;
    use crate::infrastructure::in_memory::InMemoryBroker;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn record() -> PurchaseRecord {
        PurchaseRecord {
            client_id: "C1".into(),
            location: "ottawa".into(),
            timestamp: 1,
            total: Money::new(dec!(4.50)),
            message: None,
            items: vec![ProductPurchase::new("coffee", Money::new(dec!(4.50)))],
        }
    }

    #[tokio::test]
    async fn test_text_notification() {
        let broker = InMemoryBroker::new();
        let outbound = Outbound::new(Arc::new(broker.clone()), NotificationFormat::Text);

        outbound
            .send_notification(&record(), "Thanks!", "confirm/ottawa/C1")
            .await
            .unwrap();

        let sent = broker.published().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "confirm/ottawa/C1");
        assert_eq!(sent[0].text(), "Thanks!");
    }

    #[tokio::test]
    async fn test_json_echo_notification() {
        let broker = InMemoryBroker::new();
        let outbound = Outbound::new(Arc::new(broker.clone()), NotificationFormat::Json);
        let source = record();

        outbound
            .send_notification(&source, "Thanks!", "confirm/ottawa/C1")
            .await
            .unwrap();

        let sent = broker.published().await;
        let body = purchase_codec::parse_purchase(&sent[0].text()).unwrap();
        assert_eq!(body.message.as_deref(), Some("Thanks!"));
        assert_eq!(body.total, source.total);
        assert_eq!(body.items, source.items);
        assert!(source.message.is_none());
    }

    #[tokio::test]
    async fn test_send_failure_is_delivery_error() {
        let broker = InMemoryBroker::new();
        broker.set_fail_publishes(true);
        let outbound = Outbound::new(Arc::new(broker), NotificationFormat::Text);

        let result = outbound.send("hello", "confirm/a/b").await;
        assert!(matches!(result, Err(AgentError::Delivery { .. })));
    }
}
