//! Request and response bodies for the HTTP surface.

use std::collections::BTreeMap;

use been_core::OperationHandle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(error),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddHostRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationAccepted {
    pub handle: OperationHandle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshAllResponse {
    pub handles: BTreeMap<String, OperationHandle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostKnownResponse {
    pub name: String,
    pub known: bool,
}

/// Detector upload. `key` is the correlation key the detector was started with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostDataUpload {
    pub key: String,
    pub payload: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_encoding() -> String {
    "xml".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameGroupRequest {
    pub new_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleOptionsView {
    pub pending_check_interval_ms: u64,
    pub host_detection_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LifecycleOptionsUpdate {
    pub pending_check_interval_ms: Option<u64>,
    pub host_detection_timeout_ms: Option<u64>,
}
