//! Priority scheduler.
//!
//! Pending work is ordered by priority class, then by submission order, and
//! dispatched onto the tokio runtime whenever the number of active tasks is
//! below a capacity read fresh on every dispatch decision.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod handle;
mod queue;
mod scheduler;

pub use handle::TaskHandle;
pub use scheduler::{PriorityScheduler, SchedulerStats};
