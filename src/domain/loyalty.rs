use super::purchase::Money;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Loyalty levels, ordered by the cumulative spend that unlocks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LoyaltyTier {
    #[default]
    None,
    Tier20,
    Tier40,
    Tier60,
}

impl LoyaltyTier {
    /// Reward tiers in ascending order.
    pub const LADDER: [LoyaltyTier; 3] = [Self::Tier20, Self::Tier40, Self::Tier60];

    /// Spend that must be exceeded to reach this tier.
    pub fn threshold(&self) -> Money {
        Money::new(match self {
            Self::None => Decimal::ZERO,
            Self::Tier20 => Decimal::from(20),
            Self::Tier40 => Decimal::from(40),
            Self::Tier60 => Decimal::from(60),
        })
    }

    pub fn reward(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Tier20 => Some("a free coffee"),
            Self::Tier40 => Some("$2.00 in free gas"),
            Self::Tier60 => Some("$5.00 in free gas"),
        }
    }
}

/// Current tier of every client seen so far.
#[derive(Debug, Default, Clone)]
pub struct LoyaltyState {
    tiers: HashMap<String, LoyaltyTier>,
}

impl LoyaltyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(&self, client_id: &str) -> LoyaltyTier {
        self.tiers.get(client_id).copied().unwrap_or_default()
    }

    /// Raises the client's tier. Lower tiers are ignored so a client never regresses.
    ///
    /// Returns `true` when the stored tier actually changed.
    pub fn promote(&mut self, client_id: &str, tier: LoyaltyTier) -> bool {
        let current = self.tiers.entry(client_id.to_string()).or_default();
        if tier > *current {
            *current = tier;
            true
        } else {
            false
        }
    }

    /// Tiers newly unlocked by `spent`, ascending. State is updated as each one is reached.
    pub fn advance(&mut self, client_id: &str, spent: Money) -> Vec<LoyaltyTier> {
        let mut reached = Vec::new();
        for tier in LoyaltyTier::LADDER {
            if spent > tier.threshold() && self.promote(client_id, tier) {
                reached.push(tier);
            }
        }
        reached
    }
}
