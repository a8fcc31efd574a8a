use axum::{
    Router,
    routing::{get, post, put},
};

use crate::{
    AppState,
    handlers::{
        events::lifecycle_events_sse_handler,
        groups::{
            add_group_handler, get_group_handler, list_groups_handler, remove_group_handler,
            rename_group_handler, update_group_handler,
        },
        health_handler,
        hosts::{
            add_host_handler, get_host_handler, host_connected_handler,
            host_disconnected_handler, list_hosts_handler, refresh_all_handler,
            refresh_host_handler, remove_host_handler, update_host_properties_handler,
            upload_host_data_handler,
        },
        operations::{get_operation_handler, remove_operation_handler},
        options::{get_options_handler, update_options_handler},
    },
};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .merge(create_host_routes())
        .merge(create_group_routes())
        .merge(create_operation_routes())
        .merge(create_lifecycle_routes())
}

fn create_host_routes() -> Router<AppState> {
    Router::new()
        .route("/hosts", get(list_hosts_handler).post(add_host_handler))
        .route("/hosts/refresh", post(refresh_all_handler))
        .route(
            "/hosts/{name}",
            get(get_host_handler).delete(remove_host_handler),
        )
        .route("/hosts/{name}/refresh", post(refresh_host_handler))
        .route("/hosts/{name}/properties", put(update_host_properties_handler))
        .route("/hosts/{name}/connected", post(host_connected_handler))
        .route("/hosts/{name}/disconnected", post(host_disconnected_handler))
        // Detector callback
        .route("/hosts/{name}/data", post(upload_host_data_handler))
}

fn create_group_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups_handler).post(add_group_handler))
        .route(
            "/groups/{name}",
            get(get_group_handler)
                .put(update_group_handler)
                .delete(remove_group_handler),
        )
        .route("/groups/{name}/rename", post(rename_group_handler))
}

fn create_operation_routes() -> Router<AppState> {
    Router::new().route(
        "/operations/{handle}",
        get(get_operation_handler).delete(remove_operation_handler),
    )
}

fn create_lifecycle_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(lifecycle_events_sse_handler))
        .route(
            "/options",
            get(get_options_handler).put(update_options_handler),
        )
}
