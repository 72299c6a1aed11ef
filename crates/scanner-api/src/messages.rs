use axum::{Json, extract::State, response::IntoResponse};
use scanner_types::api::CountResponse;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::params::{self, IdParam, PageParam};

pub async fn get_messages_count(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let count = state.service.get_messages_count().await?;
    Ok(Json(CountResponse { count }))
}

pub async fn get_messages_by_page(
    State(state): State<AppState>,
    page: PageParam,
) -> Result<impl IntoResponse, ApiError> {
    let page = params::page(page)?;
    Ok(Json(state.service.get_full_messages_by_page(page).await?))
}

pub async fn get_message(
    State(state): State<AppState>,
    id: IdParam,
) -> Result<impl IntoResponse, ApiError> {
    let id = params::id(id, "message id")?;
    Ok(Json(state.service.get_full_message_by_id(id).await?))
}

pub async fn get_replies(
    State(state): State<AppState>,
    id: IdParam,
) -> Result<impl IntoResponse, ApiError> {
    let id = params::id(id, "message id")?;
    Ok(Json(state.service.get_full_replies_by_message_id(id).await?))
}
