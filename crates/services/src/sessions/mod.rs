mod progress;
mod runner;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use runner::{SessionEvent, SessionRunner};
pub use workflow::{ImageSet, SessionLoopService};
