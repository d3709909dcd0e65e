//! Work-session data models.
//!
//! A `WorkSession` is one on-duty shift of a single mechanic. Mechanic id and
//! display name are copied onto the session so reports never need a user lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Pause;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, SessionStatus::Completed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkSession {
    pub id: String,
    pub mechanic_id: String,
    pub mechanic_name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pauses: Vec<Pause>,
    pub status: SessionStatus,
}

impl WorkSession {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn open_pause(&self) -> Option<&Pause> {
        self.pauses.last().filter(|pause| pause.is_open())
    }
}
