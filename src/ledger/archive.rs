use serde::{Deserialize, Serialize};

use crate::models::SettlementRecord;

/// Append-only list of settlements. Entries are never edited or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementArchive(Vec<SettlementRecord>);

impl SettlementArchive {
    pub fn appended(&self, record: SettlementRecord) -> Self {
        let mut entries = self.0.clone();
        entries.push(record);
        Self(entries)
    }

    pub fn entries(&self) -> &[SettlementRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Display order: most recent first.
    pub fn newest_first(&self) -> Vec<SettlementRecord> {
        let mut entries = self.0.clone();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }
}

impl From<Vec<SettlementRecord>> for SettlementArchive {
    fn from(entries: Vec<SettlementRecord>) -> Self {
        Self(entries)
    }
}
