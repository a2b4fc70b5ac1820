use super::purchase::{Money, PurchaseRecord};
use std::collections::BTreeSet;
use tracing::debug;

/// Append-only purchase history for a single agent.
///
/// Records are kept in receipt order and are never edited or removed. The
/// ledger is owned by the processing loop, so it needs no locking.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    records: Vec<PurchaseRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns a reference to the stored copy.
    pub fn append(&mut self, record: PurchaseRecord) -> &PurchaseRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// The client's purchase with the highest timestamp strictly before
    /// `record.timestamp`.
    ///
    /// The query record itself never qualifies since its timestamp is not
    /// strictly smaller. Among several records sharing the maximal timestamp
    /// the first inserted one wins.
    pub fn most_recent_before(
        &self,
        client_id: &str,
        record: &PurchaseRecord,
    ) -> Option<&PurchaseRecord> {
        debug!(client_id, "looking up last purchase");
        let mut latest: Option<&PurchaseRecord> = None;
        for candidate in self.records.iter() {
            if candidate.client_id != client_id || candidate.timestamp >= record.timestamp {
                continue;
            }
            match latest {
                Some(best) if candidate.timestamp <= best.timestamp => {}
                _ => latest = Some(candidate),
            }
        }
        latest
    }

    /// Sum of every recorded total for the client, `None` if it overflows.
    pub fn total_spent(&self, client_id: &str) -> Option<Money> {
        Money::checked_sum(self.records_for(client_id).map(|r| r.total))
    }

    pub fn records_for<'a>(
        &'a self,
        client_id: &'a str,
    ) -> impl Iterator<Item = &'a PurchaseRecord> + 'a {
        self.records.iter().filter(move |r| r.client_id == client_id)
    }

    /// Distinct clients seen so far, sorted.
    pub fn clients(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.client_id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PurchaseRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&PurchaseRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
