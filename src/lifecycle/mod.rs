pub mod file_lifecycle;
pub mod task;

pub use file_lifecycle::{FileLifecycle, TRAILER_SEPARATOR};
pub use task::{FileTask, TaskOutcome};
