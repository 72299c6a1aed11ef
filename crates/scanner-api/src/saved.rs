use anyhow::{Context, anyhow};
use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use scanner_db::models::SavedRow;
use scanner_types::api::{Claims, CreateSavedRequest, CreatedResponse};
use scanner_types::models::Saved;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::params::{self, IdParam};

pub async fn get_saved(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.get_saved_by_user(claims.sub))
        .await
        .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

    if rows.is_empty() {
        return Err(ApiError::not_found("saved messages not found"));
    }

    let saved = rows
        .into_iter()
        .map(to_saved)
        .collect::<anyhow::Result<Vec<Saved>>>()?;
    Ok(Json(saved))
}

pub async fn create_saved(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSavedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let user_id = claims.sub;
    let message_id = req.message_id;

    let id = tokio::task::spawn_blocking(move || {
        if db.get_full_message_by_id(message_id)?.is_none() {
            return Err(ApiError::not_found("message not found"));
        }
        match db.create_saved(user_id, message_id) {
            Ok(id) => Ok(id),
            Err(e) if scanner_db::is_unique_violation(&e) => {
                Err(ApiError::conflict("message is already saved"))
            }
            Err(e) => Err(e.into()),
        }
    })
    .await
    .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

    info!(user_id, message_id, saved_id = id, "message saved");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn delete_saved(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: IdParam,
) -> Result<impl IntoResponse, ApiError> {
    let id = params::id(id, "saved id")?;
    let db = state.db.clone();
    let deleted = tokio::task::spawn_blocking(move || db.delete_saved(id, claims.sub))
        .await
        .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

    if !deleted {
        return Err(ApiError::not_found("saved message not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn to_saved(row: SavedRow) -> anyhow::Result<Saved> {
    let created_at = chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .with_context(|| format!("saved {}: bad created_at {:?}", row.id, row.created_at))?;

    Ok(Saved {
        id: row.id,
        user_id: row.user_id,
        message_id: row.message_id,
        created_at,
    })
}
