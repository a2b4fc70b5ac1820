//! Business rules run for every recorded purchase.
//!
//! Each agent runs exactly one handler, chosen at construction through
//! [`HandlerKind`]. Handlers run on the processing loop only, so they may keep
//! their own state without synchronization.

pub mod confirmation;
pub mod fraud;
pub mod loyalty;

use crate::application::outbound::Outbound;
use crate::domain::ledger::Ledger;
use crate::domain::purchase::PurchaseRecord;
use crate::error::Result;
use async_trait::async_trait;
use clap::ValueEnum;

pub use confirmation::ConfirmationHandler;
pub use fraud::FraudHandler;
pub use loyalty::LoyaltyHandler;

/// What a handler can see and do while reacting to a purchase.
pub struct HandlerContext<'a> {
    /// History including the purchase being handled.
    pub ledger: &'a Ledger,
    pub outbound: &'a Outbound,
}

#[async_trait]
pub trait PurchaseHandler: Send {
    fn name(&self) -> &'static str;

    /// Reacts to a purchase that is already in the ledger.
    ///
    /// A failed send is returned as an error after the handler's own state
    /// has been brought up to date.
    async fn on_purchase(&mut self, record: &PurchaseRecord, ctx: &HandlerContext<'_>)
    -> Result<()>;
}

pub type PurchaseHandlerBox = Box<dyn PurchaseHandler>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HandlerKind {
    /// Thank the customer for every purchase.
    Confirmation,
    /// Reward customers crossing spend thresholds.
    Loyalty,
    /// Warn about quick purchases at different locations.
    Fraud,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 3] = [Self::Confirmation, Self::Loyalty, Self::Fraud];

    pub fn build(self) -> PurchaseHandlerBox {
        match self {
            Self::Confirmation => Box::new(ConfirmationHandler),
            Self::Loyalty => Box::new(LoyaltyHandler::new()),
            Self::Fraud => Box::new(FraudHandler::new()),
        }
    }
}
