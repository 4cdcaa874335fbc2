//! Request DTOs for API endpoints

use serde::Deserialize;
use validator::Validate;

use tuning_core::{ReportQuery, ReportSort, DEFAULT_PAGE_SIZE};

use crate::services::ServiceError;

/// Query string of the report listing
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ReportPageParams {
    /// Zero-based page index
    #[validate(range(max = 100_000, message = "page must be at most 100000"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "size must be 1-100"))]
    pub size: Option<u32>,

    /// `latest` (default) or `oldest`
    pub sort: Option<String>,
}

impl ReportPageParams {
    /// Validate and resolve defaults
    pub fn into_query(self) -> Result<ReportQuery, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let sort = match self.sort.as_deref() {
            Some(raw) => raw.parse::<ReportSort>()?,
            None => ReportSort::default(),
        };
        Ok(ReportQuery::new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE),
            sort,
        ))
    }
}
