mod alert;
mod lifecycle;
mod scheduler;
mod shutdown;

pub use lifecycle::{MonitorError, Phase};
pub use scheduler::{CycleOutcome, Monitor, MonitorBuilder, MonitorState};
pub use shutdown::ShutdownGuard;
