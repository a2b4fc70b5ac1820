use super::{HandlerContext, PurchaseHandler};
use crate::domain::destination::{MessageKind, TopicAddress};
use crate::domain::loyalty::{LoyaltyState, LoyaltyTier};
use crate::domain::purchase::PurchaseRecord;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use tracing::info;

/// Rewards customers whose cumulative spend crosses a loyalty threshold.
///
/// When one purchase crosses several thresholds every new tier is recorded,
/// but only the reward for the highest one is sent.
#[derive(Debug, Default)]
pub struct LoyaltyHandler {
    state: LoyaltyState,
}

impl LoyaltyHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(&self, client_id: &str) -> LoyaltyTier {
        self.state.tier(client_id)
    }
}

pub fn reward_message(tier: LoyaltyTier) -> Option<String> {
    let reward = tier.reward()?;
    Some(format!(
        "Thank you for your total purchases of {} at our store. You have earned {}! \
         Please come again soon to claim your reward.",
        tier.threshold(),
        reward
    ))
}

#[async_trait]
impl PurchaseHandler for LoyaltyHandler {
    fn name(&self) -> &'static str {
        "loyalty"
    }

    async fn on_purchase(
        &mut self,
        record: &PurchaseRecord,
        ctx: &HandlerContext<'_>,
    ) -> Result<()> {
        let client_id = record.client_id.as_str();
        let spent = ctx.ledger.total_spent(client_id).ok_or_else(|| {
            AgentError::MalformedPayload(format!("total spend of {client_id} overflows"))
        })?;
        info!(client_id, %spent, "total spend");

        let reached = self.state.advance(client_id, spent);
        for tier in &reached {
            info!(client_id, ?tier, "loyalty level reached");
        }

        let Some(text) = reached.last().copied().and_then(reward_message) else {
            return Ok(());
        };
        let topic = TopicAddress::topic(MessageKind::Loyalty, &record.location, client_id);
        ctx.outbound.send(&text, &topic).await
    }
}
