//! Scheduled wake-ups of the background host

pub mod scheduler;

pub use scheduler::{LifecycleScheduler, SchedulerConfig};
