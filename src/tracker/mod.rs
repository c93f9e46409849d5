pub mod commands;
pub mod controller;
pub mod state;

pub use controller::TrackerController;
pub use state::{TrackerSnapshot, TrackerState, TrackerStatus};
