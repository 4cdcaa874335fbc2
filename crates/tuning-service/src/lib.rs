//! # tuning-service
//!
//! Application layer for the report listing and reaction engine:
//!
//! - [`ReactionMutator`]: row-locked reaction toggle with bounded retry
//! - [`ReportQueryRouter`]: cache-or-database page reads with per-user enrichment
//! - [`FlushReconciler`], [`WarmupJob`], [`VisibilityJob`]: scheduled jobs
//! - [`JobScheduler`]: runs jobs as background tasks under one shutdown token

pub mod dto;
pub mod jobs;
pub mod services;

pub use jobs::{
    AlarmDispatcher, FlushReconciler, FlushSummary, JobSchedule, JobScheduler, LoggingAlarmSink,
    ScheduledJob, VisibilityJob, WarmupJob, WarmupOutcome,
};
pub use services::{
    ReactionMutator, ReportQueryRouter, RetryPolicy, ServiceContext, ServiceContextBuilder,
    ServiceError, ServiceResult,
};
