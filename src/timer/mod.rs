pub mod commands;
pub mod controller;
pub mod duration;
pub mod state;

pub use controller::{LiveBoard, LiveSession, TimerController};
pub use duration::session_duration_ms;
pub use state::SessionBook;
