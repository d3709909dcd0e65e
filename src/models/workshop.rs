//! Workshop (tenant) profile and its pricing settings.
//!
//! Settings are changed only through `SettingsUpdate`, one variant per field
//! group, so a malformed partial object can never be merged into the profile.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopSettings {
    pub tax_rate_percent: f64,
    pub freelance_multiplier: f64,
}

impl Default for WorkshopSettings {
    fn default() -> Self {
        Self {
            tax_rate_percent: 10.0,
            freelance_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub settings: WorkshopSettings,
}

impl Default for WorkshopProfile {
    fn default() -> Self {
        Self {
            id: "default".into(),
            name: "Workshop".into(),
            settings: WorkshopSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum SettingsUpdate {
    TaxRate(f64),
    FreelanceMultiplier(f64),
    Rename(String),
}

impl SettingsUpdate {
    pub fn validate(&self) -> Result<()> {
        match self {
            SettingsUpdate::TaxRate(rate) => {
                if !rate.is_finite() || *rate < 0.0 || *rate > 100.0 {
                    bail!("Invalid tax rate. Must be between 0 and 100");
                }
            }
            SettingsUpdate::FreelanceMultiplier(multiplier) => {
                if !multiplier.is_finite() || *multiplier <= 0.0 {
                    bail!("Invalid freelance multiplier. Must be greater than 0");
                }
            }
            SettingsUpdate::Rename(name) => {
                if name.trim().is_empty() {
                    bail!("Workshop name must not be blank");
                }
            }
        }
        Ok(())
    }

    /// Returns the profile with this update applied, or `None` when nothing changes.
    pub fn apply(&self, profile: &WorkshopProfile) -> Option<WorkshopProfile> {
        let mut next = profile.clone();
        match self {
            SettingsUpdate::TaxRate(rate) => next.settings.tax_rate_percent = *rate,
            SettingsUpdate::FreelanceMultiplier(multiplier) => {
                next.settings.freelance_multiplier = *multiplier
            }
            SettingsUpdate::Rename(name) => next.name = name.trim().to_string(),
        }
        (next != *profile).then_some(next)
    }
}
