use anyhow::{Context, Result};
use chrono::FixedOffset;
use log::warn;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, time::Duration};

const DATA_DIR_ENV: &str = "WORKBAY_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "workbay-data";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub tenant_id: String,
    pub poll_interval_secs: u64,
    pub tick_interval_ms: u64,
    /// Offset used for the daily report cut. Host zone when absent.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            tenant_id: "default".into(),
            poll_interval_secs: 5,
            tick_interval_ms: 1000,
            utc_offset_minutes: None,
        }
    }
}

impl AppSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(100))
    }

    pub fn report_zone(&self) -> ReportZone {
        match self.utc_offset_minutes {
            None => ReportZone::Local,
            Some(minutes) => match FixedOffset::east_opt(minutes.saturating_mul(60)) {
                Some(offset) => ReportZone::Fixed(offset),
                None => {
                    warn!("utcOffsetMinutes {minutes} out of range; using host zone");
                    ReportZone::Local
                }
            },
        }
    }
}

/// Zone whose midnight starts the daily report window. `Local` follows the
/// host zone's own rules, DST changes included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportZone {
    Local,
    Fixed(FixedOffset),
}

/// `WORKBAY_DATA_DIR`, or `./workbay-data`.
pub fn data_dir() -> PathBuf {
    env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub struct SettingsStore {
    path: PathBuf,
    data: AppSettings,
}

impl SettingsStore {
    /// Loads `path`, writing defaults there when the file does not exist yet.
    pub fn new(path: PathBuf) -> Result<Self> {
        let exists = path.exists();
        let data = if exists {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings file {}: {err}", path.display());
                AppSettings::default()
            })
        } else {
            AppSettings::default()
        };

        let store = Self { path, data };
        if !exists {
            store.persist()?;
        }
        Ok(store)
    }

    pub fn get(&self) -> AppSettings {
        self.data.clone()
    }

    fn persist(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.data)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialized)
            .with_context(|| format!("Failed to write settings to {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("Failed to replace settings at {}", self.path.display()))
    }
}
