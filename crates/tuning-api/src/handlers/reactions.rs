//! Reaction toggle handler

use axum::{extract::State, Json};
use tuning_service::dto::{ApiResponse, ToggleReactionResponse};
use tuning_service::ReactionMutator;

use crate::extractors::{Caller, ReactionPath};
use crate::response::ApiResult;
use crate::state::AppState;

/// Toggle the caller's reaction of one kind on a report
///
/// POST /api/v1/reports/{report_id}/reactions/{kind}
pub async fn toggle_reaction(
    State(state): State<AppState>,
    caller: Caller,
    path: ReactionPath,
) -> ApiResult<Json<ApiResponse<ToggleReactionResponse>>> {
    let response = ReactionMutator::new(state.service_context())
        .toggle(path.report_id, caller.user_id, path.kind)
        .await?;
    Ok(Json(ApiResponse::new(response)))
}
