//! Report listing handler

use axum::{extract::State, Json};
use tuning_service::dto::{ApiResponse, ReportPageResponse};
use tuning_service::ReportQueryRouter;

use crate::extractors::{Caller, PageQuery};
use crate::response::ApiResult;
use crate::state::AppState;

/// Fetch one page of reports with the caller's own reactions
///
/// GET /api/v1/reports?page=&size=&sort=
pub async fn list_reports(
    State(state): State<AppState>,
    caller: Caller,
    PageQuery(query): PageQuery,
) -> ApiResult<Json<ApiResponse<ReportPageResponse>>> {
    let page = ReportQueryRouter::new(state.service_context())
        .fetch_page(query, caller.user_id)
        .await?;
    Ok(Json(ApiResponse::new(page)))
}
