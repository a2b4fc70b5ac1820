use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monetary value in dollars.
///
/// Wraps `rust_decimal::Decimal` so that running totals never accumulate
/// floating-point drift. Amounts come straight off the wire, so addition is
/// only offered in checked form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Money(pub Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const MAX: Self = Self(Decimal::MAX);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `None` when the result does not fit in a `Decimal`.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Sum of `amounts`, or `None` on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// One line of a purchase: a product and what was paid for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPurchase {
    pub product: String,
    pub amount: Money,
}

impl ProductPurchase {
    pub fn new(product: impl Into<String>, amount: Money) -> Self {
        Self {
            product: product.into(),
            amount,
        }
    }
}

/// A purchase observed by an agent.
///
/// `client_id` and `location` come from the destination the message arrived
/// on; `timestamp` is the receipt time in milliseconds assigned by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRecord {
    pub client_id: String,
    pub location: String,
    pub timestamp: i64,
    pub total: Money,
    pub message: Option<String>,
    pub items: Vec<ProductPurchase>,
}

impl PurchaseRecord {
    /// Copy of this record carrying a different message text.
    pub fn with_message(&self, text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_arithmetic() {
        let m = Money::new(dec!(15.00))
            .checked_add(Money::new(dec!(10.00)))
            .unwrap();
        assert_eq!(m, Money::new(dec!(25.00)));
        assert_eq!(m.checked_add(Money::ZERO), Some(m));
    }

    #[test]
    fn test_money_sum_avoids_float_drift() {
        let total = Money::checked_sum(std::iter::repeat_n(Money::new(dec!(0.1)), 10)).unwrap();
        assert_eq!(total, Money::new(dec!(1.0)));
        assert_eq!(Money::checked_sum([]), Some(Money::ZERO));
    }

    #[test]
    fn test_money_overflow_is_reported() {
        let huge = Money::new(Decimal::from_scientific("5e28").unwrap());
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(Money::checked_sum([huge, Money::new(dec!(1)), huge]), None);
        assert_eq!(Money::MAX.checked_add(Money::new(dec!(1))), None);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(dec!(5)).to_string(), "$5.00");
        assert_eq!(Money::new(dec!(19.999)).to_string(), "$20.00");
    }

    #[test]
    fn test_with_message_copies_record() {
        let record = PurchaseRecord {
            client_id: "C1".into(),
            location: "ottawa".into(),
            timestamp: 42,
            total: Money::new(dec!(3.50)),
            message: None,
            items: vec![ProductPurchase::new("coffee", Money::new(dec!(3.50)))],
        };
        let echo = record.with_message("thanks");
        assert_eq!(echo.message.as_deref(), Some("thanks"));
        assert_eq!(echo.items, record.items);
        assert!(record.message.is_none());
    }
}
