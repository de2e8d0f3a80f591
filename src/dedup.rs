use crate::extract::BusinessRecord;

/// Ordered, duplicate-free collection of extracted records.
///
/// Insertion order is first-seen order, which makes the persisted output
/// deterministic for a given sequence of payloads. Duplicate detection is
/// full structural equality over every populated field, not just
/// title + address.
#[derive(Debug, Default)]
pub struct ResultSet {
    records: Vec<BusinessRecord>,
}

impl ResultSet {
    /// Appends `record` unless an equal record was already inserted.
    /// Returns true if the record was newly inserted.
    pub fn insert(&mut self, record: BusinessRecord) -> bool {
        // Linear probe. Records hold arbitrary JSON values (not Hash) and
        // a single results page tops out at a few hundred entries.
        if self.records.contains(&record) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn records(&self) -> &[BusinessRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
