use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Raw configuration as written in `been.toml`.
///
/// Durations are humantime strings such as `"1s"` or `"2m 30s"`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub lifecycle: FileLifecycleConfig,
    #[serde(default)]
    pub collaborators: FileCollaboratorsConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_host_names: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLifecycleConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_check_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_detection_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_workers: Option<usize>,
    /// `"off"` keeps finished statuses until a caller removes them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_ttl: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCollaboratorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_manager_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_monitor_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub resolve_host_names: Option<bool>,
    pub pending_check_interval: Option<String>,
    pub host_detection_timeout: Option<String>,
    pub event_workers: Option<usize>,
    pub status_ttl: Option<String>,
    pub task_manager_url: Option<String>,
    pub load_monitor_url: Option<String>,
    pub request_timeout: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: non_empty_var("BEEN_CONFIG").map(PathBuf::from),
            server_host: non_empty_var("BEEN_HOST"),
            server_port: non_empty_var("BEEN_PORT").and_then(|s| s.parse().ok()),
            resolve_host_names: parse_bool_var("BEEN_RESOLVE_HOSTS"),
            pending_check_interval: non_empty_var("BEEN_PENDING_CHECK_INTERVAL"),
            host_detection_timeout: non_empty_var("BEEN_HOST_DETECTION_TIMEOUT"),
            event_workers: non_empty_var("BEEN_EVENT_WORKERS").and_then(|s| s.parse().ok()),
            status_ttl: non_empty_var("BEEN_STATUS_TTL"),
            task_manager_url: non_empty_var("BEEN_TASK_MANAGER_URL"),
            load_monitor_url: non_empty_var("BEEN_LOAD_MONITOR_URL"),
            request_timeout: non_empty_var("BEEN_REQUEST_TIMEOUT"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool_var(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|raw| parse_bool(&raw))
}
