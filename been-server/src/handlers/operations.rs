use axum::{
    extract::{Path, State},
    response::Json,
};
use been_core::{OperationHandle, OperationStatus};

use crate::api::ApiResponse;
use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

/// Accepts both `op-12` and `12`.
fn parse_handle(raw: &str) -> AppResult<OperationHandle> {
    raw.parse()
        .map_err(|_| AppError::bad_request(format!("invalid operation handle '{raw}'")))
}

pub async fn get_operation_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> AppResult<Json<ApiResponse<OperationStatus>>> {
    let handle = parse_handle(&raw)?;
    let status = state.controller().get_operation_status(handle)?;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn remove_operation_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> AppResult<Json<ApiResponse<OperationStatus>>> {
    let handle = parse_handle(&raw)?;
    let status = state.controller().remove_operation_status(handle)?;
    Ok(Json(ApiResponse::success(status)))
}
