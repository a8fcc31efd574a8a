use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use been_core::{CorrelationKey, ports::UserProperties};

use crate::api::{
    AddHostRequest, ApiResponse, HostDataUpload, HostKnownResponse, OperationAccepted,
    RefreshAllResponse,
};
use crate::infra::app_state::AppState;
use crate::infra::errors::AppResult;

fn accepted(handle: been_core::OperationHandle) -> impl IntoResponse {
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(OperationAccepted { handle })),
    )
}

pub async fn add_host_handler(
    State(state): State<AppState>,
    Json(request): Json<AddHostRequest>,
) -> AppResult<impl IntoResponse> {
    let handle = state.controller().add_host(&request.name).await?;
    Ok(accepted(handle))
}

pub async fn list_hosts_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<String>>>> {
    let names = state.controller().host_names().await?;
    Ok(Json(ApiResponse::success(names)))
}

pub async fn get_host_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ApiResponse<HostKnownResponse>>> {
    let known = state.controller().is_host_known(&name).await?;
    Ok(Json(ApiResponse::success(HostKnownResponse { name, known })))
}

pub async fn remove_host_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    state.controller().remove_host(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replaces the user-editable properties of a known host.
pub async fn update_host_properties_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(properties): Json<UserProperties>,
) -> AppResult<StatusCode> {
    state
        .controller()
        .update_user_properties(&name, &properties)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn refresh_host_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let handle = state.controller().refresh_host(&name).await?;
    Ok(accepted(handle))
}

pub async fn refresh_all_handler(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let handles = state.controller().refresh_all().await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(RefreshAllResponse { handles })),
    ))
}

pub async fn host_connected_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let handle = state.controller().host_runtime_registered(&name).await?;
    Ok(accepted(handle))
}

pub async fn host_disconnected_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    state.controller().host_runtime_unregistered(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Detector callback carrying scan data for a pending operation.
pub async fn upload_host_data_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(upload): Json<HostDataUpload>,
) -> AppResult<StatusCode> {
    let key = CorrelationKey::from(upload.key);
    state
        .controller()
        .upload_host_data(&name, &key, upload.payload.as_bytes(), &upload.encoding)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
