use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use been_core::HostGroup;

use crate::api::{ApiResponse, RenameGroupRequest};
use crate::infra::app_state::AppState;
use crate::infra::errors::AppResult;

pub async fn list_groups_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<String>>>> {
    let names = state.controller().group_names().await?;
    Ok(Json(ApiResponse::success(names)))
}

pub async fn add_group_handler(
    State(state): State<AppState>,
    Json(group): Json<HostGroup>,
) -> AppResult<impl IntoResponse> {
    state.controller().add_group(&group).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(group))))
}

pub async fn get_group_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ApiResponse<HostGroup>>> {
    let group = state.controller().group(&name).await?;
    Ok(Json(ApiResponse::success(group)))
}

/// Replaces description and members. The name always comes from the path.
pub async fn update_group_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(mut group): Json<HostGroup>,
) -> AppResult<StatusCode> {
    group.name = name;
    state.controller().update_group(&group).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_group_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ApiResponse<HostGroup>>> {
    let removed = state.controller().remove_group(&name).await?;
    Ok(Json(ApiResponse::success(removed)))
}

pub async fn rename_group_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<RenameGroupRequest>,
) -> AppResult<StatusCode> {
    state
        .controller()
        .rename_group(&name, &request.new_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
