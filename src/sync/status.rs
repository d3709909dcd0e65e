use serde::{Deserialize, Serialize};

/// Coarse health of the link to the document store, shown next to the data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SyncStatus {
    Online,
    Syncing,
    Error,
    Offline,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Online => "online",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Error => "error",
            SyncStatus::Offline => "offline",
        }
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Offline
    }
}
