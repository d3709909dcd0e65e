//! Order entry: turns a service draft into a finalized `ServiceRecord`.
//!
//! labor      = freelance cost × freelance multiplier
//! subtotal   = Σ line items + labor
//! discounted = subtotal × (1 − discount%)
//! tax        = discounted × tax rate%
//! final      = discounted + tax

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{LineItem, ServiceRecord, WorkshopSettings};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDraft {
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Raw cost figure the freelance fee is derived from.
    #[serde(default)]
    pub freelance_cost: Option<f64>,
    #[serde(default)]
    pub discount_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBreakdown {
    pub parts: f64,
    pub labor: f64,
    pub discounted: f64,
    pub tax: f64,
    pub final_price: f64,
}

impl ServiceDraft {
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() && self.freelance_cost.is_none() {
            bail!("Service needs at least one item or a freelance fee");
        }
        for item in &self.items {
            if !item.unit_price.is_finite() || item.unit_price < 0.0 {
                bail!("Invalid price for item '{}'", item.name);
            }
        }
        if let Some(cost) = self.freelance_cost {
            if !cost.is_finite() || cost < 0.0 {
                bail!("Freelance cost must be a non-negative number");
            }
        }
        if !self.discount_percent.is_finite()
            || self.discount_percent < 0.0
            || self.discount_percent > 100.0
        {
            bail!("Invalid discount. Must be between 0 and 100");
        }
        Ok(())
    }

    pub fn price(&self, settings: &WorkshopSettings) -> PriceBreakdown {
        let parts: f64 = self.items.iter().map(LineItem::total).sum();
        let labor = self
            .freelance_cost
            .map(|cost| cost * settings.freelance_multiplier)
            .unwrap_or(0.0);
        let discounted = (parts + labor) * (1.0 - self.discount_percent / 100.0);
        let tax = discounted * settings.tax_rate_percent / 100.0;

        PriceBreakdown {
            parts,
            labor,
            discounted,
            tax,
            final_price: discounted + tax,
        }
    }

    /// Validates and prices the draft, attributing it to the performing mechanic.
    pub fn finalize(
        &self,
        id: String,
        mechanic_id: &str,
        mechanic_name: &str,
        settings: &WorkshopSettings,
        now: DateTime<Utc>,
    ) -> Result<ServiceRecord> {
        self.validate()?;
        let breakdown = self.price(settings);

        Ok(ServiceRecord {
            id,
            mechanic_id: mechanic_id.to_string(),
            mechanic_name: mechanic_name.to_string(),
            customer: self.customer.clone(),
            items: self.items.clone(),
            labor: breakdown.labor,
            discount_percent: self.discount_percent,
            tax: breakdown.tax,
            final_price: breakdown.final_price,
            created_at: now,
        })
    }
}
