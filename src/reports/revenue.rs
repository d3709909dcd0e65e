use serde::{Deserialize, Serialize};

use crate::models::ServiceRecord;

/// Which service records a revenue summary covers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "mechanicId", rename_all = "camelCase")]
pub enum RevenueScope {
    /// Whole workshop (management view).
    Workshop,
    /// One mechanic's own records (self-service dashboard).
    Mechanic(String),
}

impl RevenueScope {
    fn includes(&self, record: &ServiceRecord) -> bool {
        match self {
            RevenueScope::Workshop => true,
            RevenueScope::Mechanic(mechanic_id) => record.mechanic_id == *mechanic_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSummary {
    pub total_revenue: f64,
    pub total_tax: f64,
    pub service_count: usize,
    /// `total_revenue / service_count`, 0 with no services.
    pub average_ticket: f64,
}

pub fn revenue_summary(records: &[ServiceRecord], scope: &RevenueScope) -> RevenueSummary {
    let mut summary = RevenueSummary::default();
    for record in records.iter().filter(|record| scope.includes(record)) {
        summary.total_revenue += record.final_price;
        summary.total_tax += record.tax;
        summary.service_count += 1;
    }
    if summary.service_count > 0 {
        summary.average_ticket = summary.total_revenue / summary.service_count as f64;
    }
    summary
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MechanicRevenue {
    pub mechanic_id: String,
    pub mechanic_name: String,
    #[serde(flatten)]
    pub summary: RevenueSummary,
}

/// Per-mechanic revenue, highest revenue first.
pub fn revenue_by_mechanic(records: &[ServiceRecord]) -> Vec<MechanicRevenue> {
    let mut seen: Vec<(&str, &str)> = Vec::new();
    for record in records {
        if !seen.iter().any(|(id, _)| *id == record.mechanic_id) {
            seen.push((record.mechanic_id.as_str(), record.mechanic_name.as_str()));
        }
    }

    let mut ranked: Vec<MechanicRevenue> = seen
        .into_iter()
        .map(|(id, name)| MechanicRevenue {
            mechanic_id: id.to_string(),
            mechanic_name: name.to_string(),
            summary: revenue_summary(records, &RevenueScope::Mechanic(id.to_string())),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.summary
            .total_revenue
            .total_cmp(&a.summary.total_revenue)
    });
    ranked
}
