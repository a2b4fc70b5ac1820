use super::{HandlerContext, PurchaseHandler};
use crate::domain::destination::{MessageKind, TopicAddress};
use crate::domain::purchase::PurchaseRecord;
use crate::error::Result;
use async_trait::async_trait;

/// Sends a thank-you for every purchase.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfirmationHandler;

#[async_trait]
impl PurchaseHandler for ConfirmationHandler {
    fn name(&self) -> &'static str {
        "confirmation"
    }

    async fn on_purchase(
        &mut self,
        record: &PurchaseRecord,
        ctx: &HandlerContext<'_>,
    ) -> Result<()> {
        let text = format!(
            "Thank you for your purchase at our store, location {}",
            record.location
        );
        let topic = TopicAddress::topic(MessageKind::Confirm, &record.location, &record.client_id);
        ctx.outbound.send_notification(record, &text, &topic).await
    }
}
