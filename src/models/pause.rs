use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One break inside a shift. `end` stays empty while the mechanic is still on the break.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pause {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub end: Option<DateTime<Utc>>,
}

impl Pause {
    pub fn open(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Length of a closed pause. Open pauses have no length yet.
    pub fn closed_ms(&self) -> Option<i64> {
        self.end
            .map(|end| (end - self.start).num_milliseconds())
    }
}
