use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use tracing::debug;

use jornadas_protocol::{LikeData, LikeQuery, LikeResponse, ToggleRequest};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn like_data(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    query: Result<Query<LikeQuery>, QueryRejection>,
) -> ApiResult<Json<LikeData>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(state.counters.like_data(&entry_id, &query.session_id)))
}

/// Pedidos incompletos são rejeitados com `success: false` e HTTP 200.
pub async fn toggle(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> Json<LikeResponse> {
    if request.entry_id.trim().is_empty() {
        return Json(LikeResponse::rejected("entryId em falta"));
    }
    if request.session_id.trim().is_empty() {
        return Json(LikeResponse::rejected("sessionId em falta"));
    }

    let data = state
        .counters
        .apply(&request.entry_id, &request.session_id, request.action);
    debug!(
        "{} {} por {} -> {}",
        request.action.as_str(),
        request.entry_id,
        request.session_id,
        data.total
    );
    Json(LikeResponse::ok(data))
}
