//! Service-record data models.
//!
//! A `ServiceRecord` is a finalized order. Its `tax` is what feeds the
//! mechanic's pending balance; `final_price` already includes that tax.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl LineItem {
    pub fn total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: String,
    pub mechanic_id: String,
    pub mechanic_name: String,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub labor: f64,
    #[serde(default)]
    pub discount_percent: f64,
    pub tax: f64,
    pub final_price: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}
