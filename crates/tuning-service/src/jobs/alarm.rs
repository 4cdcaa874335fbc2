//! Fire-and-forget publication alarms
//!
//! Jobs hand report ids to an [`AlarmDispatcher`]; a background worker owns
//! the receiving end and calls the [`AlarmSink`]. A slow or failing sink
//! never holds up the job that published the report.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tuning_core::{AlarmSink, DomainError, ReportId};

/// Default queue depth of the dispatcher channel
pub const DEFAULT_ALARM_BUFFER: usize = 256;

/// Sending half of the alarm queue
#[derive(Clone)]
pub struct AlarmDispatcher {
    tx: mpsc::Sender<ReportId>,
}

impl AlarmDispatcher {
    /// Start the delivery worker
    ///
    /// The worker stops when `shutdown` fires or every dispatcher clone is
    /// dropped.
    pub fn spawn(
        sink: Arc<dyn AlarmSink>,
        buffer: usize,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::spawn(Self::worker_loop(sink, rx, shutdown));
        (Self { tx }, handle)
    }

    /// Queue an alarm; `false` if it had to be dropped
    pub fn notify(&self, report_id: ReportId) -> bool {
        match self.tx.try_send(report_id) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(report_id = %report_id, "Alarm queue full, dropping alarm");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(report_id = %report_id, "Alarm worker stopped, dropping alarm");
                false
            }
        }
    }

    async fn worker_loop(
        sink: Arc<dyn AlarmSink>,
        mut rx: mpsc::Receiver<ReportId>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("Alarm worker shutting down");
                    break;
                }
                next = rx.recv() => {
                    let Some(report_id) = next else {
                        debug!("Alarm queue closed");
                        break;
                    };
                    if let Err(e) = sink.report_published(report_id).await {
                        warn!(report_id = %report_id, error = %e, "Alarm delivery failed");
                    }
                }
            }
        }
    }
}

/// Sink that only records the publication in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAlarmSink;

#[async_trait]
impl AlarmSink for LoggingAlarmSink {
    async fn report_published(&self, report_id: ReportId) -> Result<(), DomainError> {
        info!(report_id = %report_id, "Report published");
        Ok(())
    }
}
