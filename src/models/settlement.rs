use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit entry written when an administrator settles a mechanic's tax balance.
/// Never edited after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub id: String,
    pub mechanic_id: String,
    pub mechanic_name: String,
    pub amount: f64,
    pub settled_by_id: String,
    pub settled_by_name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}
