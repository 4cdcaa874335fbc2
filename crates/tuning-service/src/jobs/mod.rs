//! Scheduled background jobs
//!
//! Each job exposes a `run_once` pass that tests can drive directly; the
//! [`JobScheduler`] repeats those passes on a [`JobSchedule`] until shutdown.

mod alarm;
mod flush;
mod scheduler;
mod visibility;
mod warmup;

pub use alarm::{AlarmDispatcher, LoggingAlarmSink, DEFAULT_ALARM_BUFFER};
pub use flush::{FlushReconciler, FlushSummary};
pub use scheduler::{JobSchedule, JobScheduler, ScheduledJob};
pub use visibility::VisibilityJob;
pub use warmup::{WarmupJob, WarmupOutcome};
