pub mod events;
pub mod groups;
pub mod hosts;
pub mod operations;
pub mod options;

use axum::Json;
use serde_json::{Value, json};

pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "been-host-manager",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
