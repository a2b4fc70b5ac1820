use crate::domain::delivery::Payload;
use crate::domain::ledger::Ledger;
use crate::domain::purchase::PurchaseRecord;
use crate::error::{AgentError, Result};
use crate::interfaces::json::purchase_codec;
use tracing::debug;

/// Decodes a purchase payload and records it in the ledger.
///
/// The record is appended only when decoding succeeds, so a malformed
/// payload leaves the ledger untouched. A total that would push the client's
/// running spend past what `Decimal` can hold is treated as malformed too.
pub fn decode<'l>(
    ledger: &'l mut Ledger,
    payload: &Payload,
    client_id: &str,
    location: &str,
    timestamp: i64,
) -> Result<&'l PurchaseRecord> {
    debug!(client_id, location, bytes = payload.len(), "decoding purchase");
    let body = match payload {
        Payload::Text(text) => purchase_codec::parse_purchase(text)?,
        Payload::Bytes(bytes) => purchase_codec::parse_purchase_bytes(bytes)?,
    };
    ledger
        .total_spent(client_id)
        .and_then(|spent| spent.checked_add(body.total))
        .ok_or_else(|| {
            AgentError::MalformedPayload(format!(
                "total {} overflows the running spend of {client_id}",
                body.total.value()
            ))
        })?;
    let record = ledger.append(body.into_record(client_id, location, timestamp));
    debug!(items = record.items.len(), "purchase recorded");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::purchase::Money;
    use crate::error::AgentError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decode_appends_record() {
        let mut ledger = Ledger::new();
        let payload = Payload::from(
            r#"{"total": 15, "purchases": [{"product": "gas", "amount": 15}]}"#,
        );

        let record = decode(&mut ledger, &payload, "C1", "ottawa", 1_000).unwrap();
        assert_eq!(record.client_id, "C1");
        assert_eq!(record.location, "ottawa");
        assert_eq!(record.timestamp, 1_000);
        assert_eq!(record.total, Money::new(dec!(15)));
        assert_eq!(record.items.len(), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_decode_bytes_payload() {
        let mut ledger = Ledger::new();
        let payload = Payload::Bytes(br#"{"total": 2.25}"#.to_vec());
        let record = decode(&mut ledger, &payload, "C2", "montreal", 5).unwrap();
        assert_eq!(record.total, Money::new(dec!(2.25)));
    }

    #[test]
    fn test_malformed_payload_leaves_ledger_unchanged() {
        let mut ledger = Ledger::new();
        let result = decode(&mut ledger, &Payload::from(r#"{"total": }"#), "C1", "a", 1);
        assert!(matches!(result, Err(AgentError::MalformedPayload(_))));
        assert!(ledger.is_empty());

        let result = decode(&mut ledger, &Payload::Bytes(vec![0xc3, 0x28]), "C1", "a", 2);
        assert!(matches!(result, Err(AgentError::MalformedPayload(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_overflowing_total_is_rejected() {
        let mut ledger = Ledger::new();
        let huge = Payload::from(r#"{"total": 5e28}"#);
        decode(&mut ledger, &huge, "C1", "a", 1).unwrap();

        let result = decode(&mut ledger, &huge, "C1", "a", 2);
        assert!(matches!(result, Err(AgentError::MalformedPayload(_))));
        assert_eq!(ledger.len(), 1);

        // other clients keep their own running total
        decode(&mut ledger, &huge, "C2", "a", 3).unwrap();
        assert_eq!(ledger.len(), 2);
    }
}
