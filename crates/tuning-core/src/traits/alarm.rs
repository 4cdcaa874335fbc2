//! Alarm delivery port
//!
//! Delivery itself (push, mail) lives outside this subsystem.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::value_objects::ReportId;

#[async_trait]
pub trait AlarmSink: Send + Sync {
    /// Notify subscribers that a report became visible
    async fn report_published(&self, report_id: ReportId) -> Result<(), DomainError>;
}
