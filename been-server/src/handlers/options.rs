use std::time::Duration;

use axum::{extract::State, response::Json};
use been_core::lifecycle::{LifecycleOptions, LifecycleTimings};

use crate::api::{ApiResponse, LifecycleOptionsUpdate, LifecycleOptionsView};
use crate::infra::app_state::AppState;
use crate::infra::errors::AppResult;

fn view(options: &LifecycleOptions) -> LifecycleOptionsView {
    let timings = options.timings();
    LifecycleOptionsView {
        pending_check_interval_ms: millis(timings.pending_check_interval),
        host_detection_timeout_ms: millis(timings.host_detection_timeout),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub async fn get_options_handler(
    State(state): State<AppState>,
) -> Json<ApiResponse<LifecycleOptionsView>> {
    Json(ApiResponse::success(view(state.controller().options())))
}

/// Applies whichever timings are present; the watchdog restarts on change.
pub async fn update_options_handler(
    State(state): State<AppState>,
    Json(update): Json<LifecycleOptionsUpdate>,
) -> AppResult<Json<ApiResponse<LifecycleOptionsView>>> {
    let options = state.controller().options();
    let current = options.timings();
    options.apply(LifecycleTimings {
        pending_check_interval: update
            .pending_check_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(current.pending_check_interval),
        host_detection_timeout: update
            .host_detection_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(current.host_detection_timeout),
    })?;
    Ok(Json(ApiResponse::success(view(options))))
}
