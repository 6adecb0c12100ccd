//! Value records tracked by the monitor.
//!
//! Each transition borrows the current record and returns a new one; the
//! monitor swaps the result into its published snapshot in a single step.

mod adjustment;
mod error;
mod notification;

pub use adjustment::AdjustmentState;
pub use error::ErrorState;
pub use notification::NotificationState;
