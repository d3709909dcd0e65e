//! Read-only rollups derived from the current snapshot. Nothing here mutates state.

pub mod revenue;
pub mod time;

pub use revenue::{revenue_by_mechanic, revenue_summary, MechanicRevenue, RevenueScope, RevenueSummary};
pub use time::{mechanic_time, time_rollup, MechanicTime, TimeWindow};
