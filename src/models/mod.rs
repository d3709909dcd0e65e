pub mod pause;
pub mod service;
pub mod session;
pub mod settlement;
pub mod user;
pub mod workshop;

pub use pause::Pause;
pub use service::{LineItem, ServiceRecord};
pub use session::{SessionStatus, WorkSession};
pub use settlement::SettlementRecord;
pub use user::{Role, User};
pub use workshop::{SettingsUpdate, WorkshopProfile, WorkshopSettings};
