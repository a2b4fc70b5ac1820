use crate::domain::delivery::Payload;
use crate::domain::destination::{MessageKind, TopicAddress};
use crate::domain::ports::BrokerBox;
use crate::domain::purchase::ProductPurchase;
use crate::error::{AgentError, Result};
use crate::interfaces::csv::purchase_script::ScriptedPurchase;
use crate::interfaces::json::purchase_codec::encode_purchase;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::info;

/// Point-of-sale side: publishes purchases for agents to pick up.
#[derive(Clone)]
pub struct PurchaseClient {
    broker: BrokerBox,
}

impl PurchaseClient {
    pub fn new(broker: BrokerBox) -> Self {
        Self { broker }
    }

    /// Publishes one purchase on `purchase/<location>/<client>` and returns the topic.
    pub async fn publish(
        &self,
        client_id: &str,
        location: &str,
        items: &[ProductPurchase],
    ) -> Result<String> {
        if !is_topic_segment(client_id) || !is_topic_segment(location) {
            return Err(AgentError::Config(format!(
                "cannot address purchase for client '{client_id}' at '{location}'"
            )));
        }
        let topic = TopicAddress::topic(MessageKind::Purchase, location, client_id);
        let body = encode_purchase(items)?;
        self.broker.publish(&topic, Payload::Text(body)).await?;
        info!(%topic, items = items.len(), "purchase published");
        Ok(topic)
    }

    pub async fn publish_scripted(&self, purchase: &ScriptedPurchase) -> Result<String> {
        self.publish(&purchase.client, &purchase.location, &[purchase.item()])
            .await
    }
}

/// A client or location must fill exactly one topic level.
pub(crate) fn is_topic_segment(value: &str) -> bool {
    !value.is_empty() && !value.contains('/')
}

const CLIENTS: [&str; 6] = ["C1", "C2", "C3", "C4", "C5", "C6"];
const LOCATIONS: [&str; 4] = ["ottawa", "montreal", "toronto", "quebec"];
const PRODUCTS: [&str; 5] = ["coffee", "gas", "sandwich", "newspaper", "snacks"];

/// Random purchases over a small fixed set of clients and stores.
///
/// Seeded runs are reproducible, which keeps simulations comparable.
pub struct SyntheticPurchases {
    rng: StdRng,
}

impl SyntheticPurchases {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn next_purchase(&mut self) -> ScriptedPurchase {
        let pick = |rng: &mut StdRng, from: &[&str]| -> String {
            from.choose(rng).copied().unwrap_or_default().to_string()
        };
        let client = pick(&mut self.rng, &CLIENTS);
        let location = pick(&mut self.rng, &LOCATIONS);
        let product = pick(&mut self.rng, &PRODUCTS);
        // whole cents between $0.50 and $30.00
        let cents: i64 = self.rng.gen_range(50..=3000);
        ScriptedPurchase {
            client,
            location,
            product,
            amount: Decimal::new(cents, 2),
        }
    }

    pub fn take(mut self, count: usize) -> Vec<ScriptedPurchase> {
        (0..count).map(|_| self.next_purchase()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::purchase::Money;
    use crate::infrastructure::in_memory::InMemoryBroker;
    use crate::interfaces::json::purchase_codec::parse_purchase;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_publish_addresses_and_encodes_purchase() {
        let broker = InMemoryBroker::new();
        let client = PurchaseClient::new(Arc::new(broker.clone()));
        let items = [
            ProductPurchase::new("coffee", Money::new(dec!(2.50))),
            ProductPurchase::new("gas", Money::new(dec!(40))),
        ];

        let topic = client.publish("C1", "ottawa", &items).await.unwrap();
        assert_eq!(topic, "purchase/ottawa/C1");

        let sent = broker.published().await;
        let body = parse_purchase(&sent[0].text()).unwrap();
        assert_eq!(body.total, Money::new(dec!(42.50)));
        assert_eq!(body.items, items.to_vec());
    }

    #[tokio::test]
    async fn test_publish_rejects_unaddressable_client() {
        let broker = InMemoryBroker::new();
        let client = PurchaseClient::new(Arc::new(broker.clone()));
        assert!(client.publish("a/b", "ottawa", &[]).await.is_err());
        assert!(client.publish("C1", "", &[]).await.is_err());
        assert!(matches!(
            client.publish("C1", "a/b", &[]).await,
            Err(AgentError::Config(_))
        ));
        assert!(broker.published().await.is_empty());
    }

    #[test]
    fn test_synthetic_purchases_are_reproducible() {
        let first = SyntheticPurchases::new(Some(7)).take(20);
        let second = SyntheticPurchases::new(Some(7)).take(20);
        assert_eq!(first, second);
        for purchase in &first {
            assert!(CLIENTS.contains(&purchase.client.as_str()));
            assert!(LOCATIONS.contains(&purchase.location.as_str()));
            assert!(purchase.amount >= dec!(0.50) && purchase.amount <= dec!(30.00));
        }
    }
}
