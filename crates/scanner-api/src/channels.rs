use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use scanner_types::api::CountResponse;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::params::{self, IdParam, PageParam};

pub async fn get_channels_count(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let count = state.service.get_channels_count().await?;
    Ok(Json(CountResponse { count }))
}

pub async fn get_channels_by_page(
    State(state): State<AppState>,
    page: PageParam,
) -> Result<impl IntoResponse, ApiError> {
    let page = params::page(page)?;
    Ok(Json(state.service.get_channels_by_page(page).await?))
}

pub async fn get_channel_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get_channel_by_name(&name).await?))
}

pub async fn get_messages_count(
    State(state): State<AppState>,
    channel_id: IdParam,
) -> Result<impl IntoResponse, ApiError> {
    let channel_id = params::id(channel_id, "channel id")?;
    let count = state.service.get_messages_count_by_channel_id(channel_id).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn get_messages_by_page(
    State(state): State<AppState>,
    channel_id: IdParam,
    page: PageParam,
) -> Result<impl IntoResponse, ApiError> {
    let channel_id = params::id(channel_id, "channel id")?;
    let page = params::page(page)?;
    Ok(Json(
        state
            .service
            .get_full_messages_by_channel_id_and_page(channel_id, page)
            .await?,
    ))
}
