//! Server setup and initialization
//!
//! Wires the PostgreSQL and Redis adapters into the service context, starts
//! the scheduled jobs, and serves HTTP until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tuning_cache::{RedisLeaderLock, RedisPool, RedisReportCache};
use tuning_common::{AppConfig, AppError};
use tuning_db::{create_pool, run_migrations, PgPool, PgReportRepository};
use tuning_service::jobs::DEFAULT_ALARM_BUFFER;
use tuning_service::{
    AlarmDispatcher, FlushReconciler, JobSchedule, JobScheduler, LoggingAlarmSink, ServiceContext,
    VisibilityJob, WarmupJob,
};

use crate::middleware::apply_middleware;
use crate::routes::create_router;
use crate::state::AppState;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let router = create_router();
    let router = apply_middleware(router);
    router.with_state(state)
}

/// Assemble the application state from already created pools
///
/// Does no I/O; pools connect on first use.
pub fn build_state(config: AppConfig, pool: PgPool, redis_pool: RedisPool) -> Result<AppState, AppError> {
    let report_repo = PgReportRepository::new(pool.clone())
        .with_lock_timeout(Duration::from_millis(config.database.lock_timeout_ms));
    let cache = RedisReportCache::new(redis_pool.clone(), &config.cache);
    let leader_lock = RedisLeaderLock::new(redis_pool.clone());

    let service_context = ServiceContext::builder()
        .report_repo(Arc::new(report_repo))
        .cache(Arc::new(cache))
        .leader_lock(Arc::new(leader_lock))
        .with_config(&config)
        .build()?;

    Ok(AppState::new(service_context, config, pool, redis_pool))
}

/// Connect to PostgreSQL and Redis, migrate, and build the AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    // Create database pool
    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&config.database)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    run_migrations(&pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    // Create Redis pool
    info!("Connecting to Redis...");
    let redis_pool =
        RedisPool::from_config(&config.redis).map_err(|e| AppError::Cache(e.to_string()))?;
    if let Err(e) = redis_pool.health_check().await {
        // Not fatal: every cache path degrades to the database
        warn!(error = %e, "Redis not reachable at startup");
    } else {
        info!("Redis connection established");
    }

    build_state(config, pool, redis_pool)
}

/// Scheduled jobs and the alarm worker they feed
pub struct BackgroundJobs {
    scheduler: JobScheduler,
    alarm_worker: JoinHandle<()>,
}

impl BackgroundJobs {
    /// Spawn the flush, warmup and visibility jobs
    pub fn start(state: &AppState, shutdown: CancellationToken) -> Self {
        let ctx = state.service_context().clone();
        let jobs = &state.config().jobs;

        let (alarms, alarm_worker) = AlarmDispatcher::spawn(
            Arc::new(LoggingAlarmSink),
            DEFAULT_ALARM_BUFFER,
            shutdown.clone(),
        );

        let mut scheduler = JobScheduler::new(shutdown);
        scheduler.spawn(
            FlushReconciler::new(ctx.clone()),
            JobSchedule::Every(jobs.flush_interval),
        );
        scheduler.spawn(
            WarmupJob::new(ctx.clone()),
            JobSchedule::Weekly {
                weekday: jobs.warmup_weekday,
                hour: jobs.warmup_hour,
                minute: jobs.warmup_minute,
            },
        );
        scheduler.spawn(
            VisibilityJob::new(ctx, jobs.visibility_delay, alarms),
            JobSchedule::Every(jobs.visibility_interval),
        );

        info!(jobs = scheduler.len(), "Background jobs started");
        Self {
            scheduler,
            alarm_worker,
        }
    }

    /// Stop all jobs and wait for in-flight runs
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;
        if let Err(e) = self.alarm_worker.await {
            warn!(error = %e, "Alarm worker aborted");
        }
    }
}

/// Run the HTTP server until `shutdown` fires
pub async fn run_server(app: Router, addr: SocketAddr, shutdown: CancellationToken) -> Result<(), AppError> {
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Cancel `shutdown` on Ctrl-C
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        info!("Shutdown signal received");
        shutdown.cancel();
    });
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .api
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid API address: {e}")))?;
    let jobs_enabled = config.jobs.enabled;

    // Create app state
    let state = create_app_state(config).await?;

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let jobs = jobs_enabled.then(|| BackgroundJobs::start(&state, shutdown.child_token()));

    // Build application
    let app = create_app(state);

    // Run server
    let result = run_server(app, addr, shutdown.clone()).await;

    shutdown.cancel();
    if let Some(jobs) = jobs {
        jobs.shutdown().await;
    }
    info!("Server stopped");

    result
}
