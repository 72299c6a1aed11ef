use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::params::{self, IdParam};

pub async fn get_user(
    State(state): State<AppState>,
    id: IdParam,
) -> Result<impl IntoResponse, ApiError> {
    let id = params::id(id, "user id")?;
    Ok(Json(state.service.get_user_by_id(id).await?))
}

pub async fn get_user_messages(
    State(state): State<AppState>,
    id: IdParam,
) -> Result<impl IntoResponse, ApiError> {
    let id = params::id(id, "user id")?;
    Ok(Json(state.service.get_full_messages_by_user_id(id).await?))
}
