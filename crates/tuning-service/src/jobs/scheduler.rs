//! Background job scheduler
//!
//! Every job runs in its own task under a shared [`CancellationToken`].
//! Cancellation is observed between runs; a run in progress completes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Utc, Weekday};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::services::ServiceResult;

/// A unit of periodic work
#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn run(&self) -> ServiceResult<()>;
}

/// When a job fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSchedule {
    /// Fixed period, first run one period after start
    Every(Duration),
    /// Once a week at `hour:minute` UTC
    Weekly {
        weekday: Weekday,
        hour: u32,
        minute: u32,
    },
}

impl JobSchedule {
    /// Time to wait from `now` until the next run
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        match *self {
            Self::Every(period) => period,
            Self::Weekly {
                weekday,
                hour,
                minute,
            } => {
                let days_ahead = (i64::from(weekday.num_days_from_monday())
                    - i64::from(now.weekday().num_days_from_monday()))
                .rem_euclid(7);
                let at = NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0)
                    .unwrap_or(NaiveTime::MIN);

                let mut next = (now.date_naive() + TimeDelta::days(days_ahead))
                    .and_time(at)
                    .and_utc();
                if next <= now {
                    next += TimeDelta::weeks(1);
                }
                (next - now).to_std().unwrap_or(Duration::ZERO)
            }
        }
    }
}

/// Owns the job tasks and their shutdown scope
pub struct JobScheduler {
    shutdown: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl JobScheduler {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            shutdown,
            tasks: Vec::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn `job` on `schedule`
    pub fn spawn<J: ScheduledJob>(&mut self, job: J, schedule: JobSchedule) {
        let name = job.name();
        let handle = tokio::spawn(run_job(Arc::new(job), schedule, self.shutdown.clone()));
        self.tasks.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel all jobs and wait for their tasks to finish
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                error!(job = name, error = %e, "Job task aborted");
            }
        }
        info!("Job scheduler stopped");
    }
}

async fn run_job(job: Arc<dyn ScheduledJob>, schedule: JobSchedule, shutdown: CancellationToken) {
    let name = job.name();
    info!(job = name, schedule = ?schedule, "Job scheduled");

    loop {
        let delay = schedule.delay_from(Utc::now());
        debug!(job = name, delay_secs = delay.as_secs(), "Next run");

        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        let started = Instant::now();
        match job.run().await {
            Ok(()) => debug!(
                job = name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job run finished"
            ),
            Err(e) => warn!(job = name, error = %e, "Job run failed"),
        }
    }

    info!(job = name, "Job stopped");
}
