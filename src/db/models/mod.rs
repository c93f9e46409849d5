mod distraction;
mod session;

pub use distraction::Distraction;
pub use session::{Session, SessionStatus, TrackingMode};
