pub mod accrual;
pub mod archive;
pub mod commands;

pub use accrual::{accrue, settle, Settler};
pub use archive::SettlementArchive;
