//! Scheduled collection: read the dataset, publish every record, repeat.

pub mod coordinator;
pub mod scheduler;

pub use coordinator::{BatchCoordinator, PassError};
pub use scheduler::{
    PassTrigger, Scheduler, SchedulerHandle, SchedulerPhase, SchedulerReport, SchedulerState,
};
