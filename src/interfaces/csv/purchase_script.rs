use crate::application::client::is_topic_segment;
use crate::domain::purchase::{Money, ProductPurchase};
use crate::error::{AgentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One scripted purchase: a client buying a single product at a location.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ScriptedPurchase {
    pub client: String,
    pub location: String,
    pub product: String,
    pub amount: Decimal,
}

impl ScriptedPurchase {
    pub fn item(&self) -> ProductPurchase {
        ProductPurchase::new(self.product.clone(), Money::new(self.amount))
    }
}

/// Reads scripted purchases from a CSV source.
///
/// Expects a `client, location, product, amount` header. Whitespace around
/// fields is trimmed and rows with missing trailing fields surface as errors
/// instead of aborting the whole script.
pub struct PurchaseScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PurchaseScriptReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows. Rows with a blank client or location, or one
    /// containing `/`, are rejected since they could never be published on a
    /// well-formed topic.
    pub fn purchases(self) -> impl Iterator<Item = Result<ScriptedPurchase>> {
        self.reader.into_deserialize().map(|result| {
            let row: ScriptedPurchase = result.map_err(AgentError::from)?;
            if !is_topic_segment(&row.client) || !is_topic_segment(&row.location) {
                return Err(AgentError::Config(format!(
                    "scripted purchase has an unusable client or location: {row:?}"
                )));
            }
            Ok(row)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "client, location, product, amount\nC1, ottawa, coffee, 2.50\nC2, montreal, gas, 40";
        let reader = PurchaseScriptReader::new(data.as_bytes());
        let results: Vec<Result<ScriptedPurchase>> = reader.purchases().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.client, "C1");
        assert_eq!(first.location, "ottawa");
        assert_eq!(first.item(), ProductPurchase::new("coffee", Money::new(dec!(2.50))));
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "client, location, product, amount\nC1, ottawa, coffee, lots\nC1, ottawa, tea, 1";
        let reader = PurchaseScriptReader::new(data.as_bytes());
        let results: Vec<Result<ScriptedPurchase>> = reader.purchases().collect();

        assert!(matches!(results[0], Err(AgentError::CsvError(_))));
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_reader_rejects_blank_location() {
        let data = "client, location, product, amount\nC1, , coffee, 1\nC1, a/b, coffee, 1\nC/2, ottawa, tea, 1";
        let reader = PurchaseScriptReader::new(data.as_bytes());
        let results: Vec<Result<ScriptedPurchase>> = reader.purchases().collect();

        assert_eq!(results.len(), 3);
        for result in &results {
            assert!(matches!(result, Err(AgentError::Config(_))));
        }
    }
}
