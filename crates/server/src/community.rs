use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::json;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use jornadas_protocol::{ContentEntry, ContentListing, NewEntry};
use jornadas_storage::update_with_retry;

use crate::auth::Admin;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Listagem da comunidade com os totais de likes atuais.
/// Um documento inexistente é servido como listagem vazia.
pub async fn listing(State(state): State<AppState>) -> ApiResult<Json<ContentListing>> {
    let mut listing = match state.documents.load().await? {
        Some(versioned) => versioned.document,
        None => ContentListing::empty(OffsetDateTime::now_utc()),
    };
    for entry in &mut listing.entries {
        entry.likes = state.counters.total(&entry.id);
    }
    Ok(Json(listing))
}

pub async fn append(
    _admin: Admin,
    State(state): State<AppState>,
    Json(new): Json<NewEntry>,
) -> ApiResult<(StatusCode, Json<ContentEntry>)> {
    new.validate().map_err(ApiError::BadRequest)?;

    let entry = ContentEntry {
        id: Uuid::new_v4().to_string(),
        kind: new.kind,
        display_name: new.display_name.trim().to_string(),
        content: new.content,
        image_url: new.image_url,
        likes: 0,
        created_at: OffsetDateTime::now_utc(),
    };

    let created = update_with_retry(state.documents.as_ref(), state.max_retries, |doc| {
        doc.entries.push(entry.clone());
        Some(entry.clone())
    })
    .await?;
    let Some(created) = created else {
        return Err(ApiError::BadRequest("entrada não gravada".into()));
    };

    info!("nova entrada {} ({})", created.id, created.display_name);
    state.dispatch.content_updated(json!({ "added": created.id }));
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn remove(
    _admin: Admin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let removed = update_with_retry(state.documents.as_ref(), state.max_retries, |doc| {
        let before = doc.entries.len();
        doc.entries.retain(|e| e.id != id);
        (doc.entries.len() < before).then_some(())
    })
    .await?;

    if removed.is_none() {
        return Err(ApiError::NotFound(id));
    }
    info!("entrada removida: {id}");
    state.dispatch.content_updated(json!({ "removed": id }));
    Ok(StatusCode::NO_CONTENT)
}
