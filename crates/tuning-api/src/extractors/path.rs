//! Path parameter extractors

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tuning_core::{ReactionKind, ReportId};

use crate::response::ApiError;

/// `/reports/:report_id/reactions/:kind`
#[derive(Debug, Clone, Copy)]
pub struct ReactionPath {
    pub report_id: ReportId,
    pub kind: ReactionKind,
}

#[async_trait]
impl<S> FromRequestParts<S> for ReactionPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((report_id, kind)) = Path::<(String, String)>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_path(e.to_string()))?;

        let report_id = report_id
            .parse::<ReportId>()
            .map_err(|_| ApiError::invalid_path("Invalid report_id format"))?;
        let kind = kind
            .parse::<ReactionKind>()
            .map_err(|_| ApiError::invalid_path(format!("Unknown reaction kind: {kind}")))?;

        Ok(Self { report_id, kind })
    }
}
