use crate::domain::purchase::{Money, ProductPurchase, PurchaseRecord};
use crate::error::{AgentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::str::FromStr;

/// JSON body of a purchase message.
///
/// Numbers are read as raw JSON numbers and converted to `Decimal` so that a
/// quoted `"12.50"` is rejected rather than silently accepted.
#[derive(Debug, Deserialize)]
struct PurchaseWire {
    total: Number,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    purchases: Vec<ProductWire>,
}

#[derive(Debug, Deserialize)]
struct ProductWire {
    product: String,
    amount: Number,
}

#[derive(Debug, Serialize)]
struct PurchaseOut<'a> {
    total: Number,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    purchases: Vec<ProductOut<'a>>,
}

#[derive(Debug, Serialize)]
struct ProductOut<'a> {
    product: &'a str,
    amount: Number,
}

/// The payload fields of a purchase, before it is attributed to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseBody {
    pub total: Money,
    pub message: Option<String>,
    pub items: Vec<ProductPurchase>,
}

impl PurchaseBody {
    pub fn into_record(self, client_id: &str, location: &str, timestamp: i64) -> PurchaseRecord {
        PurchaseRecord {
            client_id: client_id.to_string(),
            location: location.to_string(),
            timestamp,
            total: self.total,
            message: self.message,
            items: self.items,
        }
    }
}

fn to_money(field: &str, number: &Number) -> Result<Money> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Money::new)
        .map_err(|e| AgentError::MalformedPayload(format!("{field} '{text}' out of range: {e}")))
}

fn to_number(amount: Money) -> Result<Number> {
    Number::from_str(&amount.value().normalize().to_string())
        .map_err(|e| AgentError::Encoding(format!("{amount}: {e}")))
}

/// Parses a purchase body from JSON text.
pub fn parse_purchase(text: &str) -> Result<PurchaseBody> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(AgentError::MalformedPayload(
            "payload is not a JSON object".into(),
        ));
    }
    let wire: PurchaseWire = serde_json::from_value(value)?;
    let total = to_money("total", &wire.total)?;
    let items = wire
        .purchases
        .iter()
        .map(|p| Ok(ProductPurchase::new(p.product.clone(), to_money("amount", &p.amount)?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(PurchaseBody {
        total,
        message: wire.message,
        items,
    })
}

/// Parses a purchase body from raw bytes, which must be UTF-8.
pub fn parse_purchase_bytes(bytes: &[u8]) -> Result<PurchaseBody> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| AgentError::MalformedPayload(format!("payload is not UTF-8: {e}")))?;
    parse_purchase(text)
}

/// Serializes a record back into the purchase wire format.
pub fn encode_record(record: &PurchaseRecord, include_message: bool) -> Result<String> {
    encode(
        record.total,
        record.message.as_deref().filter(|_| include_message),
        &record.items,
    )
}

/// Builds the payload a point-of-sale client publishes.
pub fn encode_purchase(items: &[ProductPurchase]) -> Result<String> {
    let total = Money::checked_sum(items.iter().map(|i| i.amount))
        .ok_or_else(|| AgentError::Encoding("item amounts overflow the purchase total".into()))?;
    encode(total, None, items)
}

fn encode(total: Money, message: Option<&str>, items: &[ProductPurchase]) -> Result<String> {
    let out = PurchaseOut {
        total: to_number(total)?,
        message,
        purchases: items
            .iter()
            .map(|i| {
                Ok(ProductOut {
                    product: &i.product,
                    amount: to_number(i.amount)?,
                })
            })
            .collect::<Result<Vec<_>>>()?,
    };
    serde_json::to_string(&out).map_err(|e| AgentError::Encoding(e.to_string()))
}
