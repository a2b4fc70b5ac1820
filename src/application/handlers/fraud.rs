use super::{HandlerContext, PurchaseHandler};
use crate::domain::destination::{MessageKind, TopicAddress};
use crate::domain::purchase::PurchaseRecord;
use crate::error::Result;
use async_trait::async_trait;
use tracing::{info, warn};

/// Purchases this many whole minutes apart, or more, are never suspicious.
pub const FRAUD_WINDOW_MINUTES: i64 = 5;

const FRAUD_WARNING: &str = "Your last purchase was less than 5 minutes ago, from a different location. \
     This looks like a possible fraudulent usage. Please contact our customer service center.";

/// Warns a customer when two purchases happen at different locations
/// within a few minutes of each other.
#[derive(Debug)]
pub struct FraudHandler {
    window_minutes: i64,
}

impl Default for FraudHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl FraudHandler {
    pub fn new() -> Self {
        Self {
            window_minutes: FRAUD_WINDOW_MINUTES,
        }
    }

    /// Whole minutes between two receipt times, truncated toward zero.
    fn elapsed_minutes(earlier: i64, later: i64) -> i64 {
        (later - earlier) / 1000 / 60
    }
}

#[async_trait]
impl PurchaseHandler for FraudHandler {
    fn name(&self) -> &'static str {
        "fraud"
    }

    async fn on_purchase(
        &mut self,
        record: &PurchaseRecord,
        ctx: &HandlerContext<'_>,
    ) -> Result<()> {
        let client_id = record.client_id.as_str();
        let Some(previous) = ctx.ledger.most_recent_before(client_id, record) else {
            return Ok(());
        };

        if previous.location == record.location {
            info!(client_id, "last purchase was at the same location");
            return Ok(());
        }

        let minutes = Self::elapsed_minutes(previous.timestamp, record.timestamp);
        if minutes >= self.window_minutes {
            return Ok(());
        }

        warn!(
            client_id,
            from = %previous.location,
            to = %record.location,
            minutes,
            "possible fraud: purchases at different locations"
        );
        let topic = TopicAddress::topic(MessageKind::Fraud, &record.location, client_id);
        ctx.outbound
            .send_notification(record, FRAUD_WARNING, &topic)
            .await
    }
}
