use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use been_core::LifecycleConfig;
use thiserror::Error;
use url::Url;

use super::models::{
    CollaboratorsConfig, Config, ConfigLoad, ConfigMetadata, ConfigWarnings, ServerConfig,
};
use super::sources::{EnvConfig, FileConfig, parse_bool};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["been.toml", "config/been.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

/// Builds a [`Config`] from defaults, an optional TOML file and the
/// environment, in increasing order of precedence.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path)
                .map(|_| true)
                .or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let env_config = EnvConfig::gather();
        let (file_config, config_path) = self.load_file_config(&env_config)?;
        let (config, warnings) =
            compose_config(file_config, env_config, config_path, env_file_loaded)?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env_config.config_path {
            source.env = Some(from_env.clone());
        } else {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists());
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
    env_file_loaded: bool,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();
    if config_path.is_none() {
        warnings.push_with_hint(
            "No been.toml detected; using defaults and environment variables",
            "Create been.toml or pass --config to pin lifecycle timings",
        );
    }

    let FileConfig {
        server: file_server,
        lifecycle: file_lifecycle,
        collaborators: file_collaborators,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(7700),
        resolve_host_names: env
            .resolve_host_names
            .or(file_server.resolve_host_names)
            .unwrap_or(true),
    };

    let defaults = LifecycleConfig::default();
    let pending_check_interval = duration_setting(
        "pending_check_interval",
        env.pending_check_interval.or(file_lifecycle.pending_check_interval),
    )?
    .unwrap_or(Duration::from_millis(defaults.pending_check_interval_ms));
    let host_detection_timeout = duration_setting(
        "host_detection_timeout",
        env.host_detection_timeout.or(file_lifecycle.host_detection_timeout),
    )?
    .unwrap_or(Duration::from_millis(defaults.host_detection_timeout_ms));
    if pending_check_interval.is_zero() || host_detection_timeout.is_zero() {
        return Err(ConfigLoadError::ZeroDuration);
    }
    if pending_check_interval > host_detection_timeout {
        warnings.push(format!(
            "pending_check_interval ({}) exceeds host_detection_timeout ({}); \
             timeouts will be detected late",
            humantime::format_duration(pending_check_interval),
            humantime::format_duration(host_detection_timeout),
        ));
    }

    let status_ttl_secs = match env.status_ttl.or(file_lifecycle.status_ttl) {
        Some(raw) if is_disabled(&raw) => None,
        Some(raw) => Some(parse_duration("status_ttl", &raw)?.as_secs()),
        None => defaults.status_ttl_secs,
    };
    if status_ttl_secs == Some(0) {
        return Err(ConfigLoadError::ZeroDuration);
    }

    let lifecycle = LifecycleConfig {
        pending_check_interval_ms: millis(pending_check_interval),
        host_detection_timeout_ms: millis(host_detection_timeout),
        event_workers: env
            .event_workers
            .or(file_lifecycle.event_workers)
            .unwrap_or(defaults.event_workers)
            .max(1),
        status_ttl_secs,
    };

    let task_manager_url = url_setting(
        "task_manager_url",
        env.task_manager_url.or(file_collaborators.task_manager_url),
    )?;
    let load_monitor_url = url_setting(
        "load_monitor_url",
        env.load_monitor_url.or(file_collaborators.load_monitor_url),
    )?;
    if task_manager_url.is_none() {
        warnings.push_with_hint(
            "No task manager configured; detectors cannot be scheduled",
            "Set BEEN_TASK_MANAGER_URL or [collaborators].task_manager_url",
        );
    }
    if load_monitor_url.is_none() {
        warnings.push_with_hint(
            "No load monitor configured; connected nodes will fail monitoring setup",
            "Set BEEN_LOAD_MONITOR_URL or [collaborators].load_monitor_url",
        );
    }
    let collaborators = CollaboratorsConfig {
        task_manager_url,
        load_monitor_url,
        request_timeout: duration_setting(
            "request_timeout",
            env.request_timeout.or(file_collaborators.request_timeout),
        )?
        .unwrap_or(CollaboratorsConfig::default().request_timeout),
    };

    let config = Config {
        server,
        lifecycle,
        collaborators,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded,
        },
    };
    Ok((config, warnings))
}

fn is_disabled(raw: &str) -> bool {
    parse_bool(raw) == Some(false) || raw.trim().eq_ignore_ascii_case("none")
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_duration(field: &'static str, raw: &str) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|source| ConfigLoadError::InvalidDuration {
        field,
        value: raw.to_string(),
        source,
    })
}

fn duration_setting(
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<Duration>, ConfigLoadError> {
    raw.map(|value| parse_duration(field, &value)).transpose()
}

fn url_setting(field: &'static str, raw: Option<String>) -> Result<Option<Url>, ConfigLoadError> {
    raw.map(|value| {
        Url::parse(value.trim()).map_err(|source| ConfigLoadError::InvalidUrl {
            field,
            value,
            source,
        })
    })
    .transpose()
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration for {field}: '{value}'")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("lifecycle durations must be greater than zero (status_ttl at least one second)")]
    ZeroDuration,
    #[error("invalid URL for {field}: '{value}'")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(self, ConfigPathProvenance::Explicit | ConfigPathProvenance::Env)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::infra::config::sources::FileServerConfig;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    fn load_file(path: &std::path::Path) -> FileConfig {
        let loader = ConfigLoader::new().with_config_path(path);
        let (file, _) = loader
            .load_file_config(&EnvConfig::default())
            .expect("file loads");
        file.expect("file present")
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(
            r#"
            [server]
            port = 9000

            [lifecycle]
            pending_check_interval = "250ms"
            host_detection_timeout = "30s"
            status_ttl = "off"

            [collaborators]
            task_manager_url = "http://tasks.local:8080/"
            "#,
        );
        let parsed = load_file(file.path());
        let (config, warnings) = compose_config(
            Some(parsed),
            EnvConfig::default(),
            Some(file.path().to_path_buf()),
            false,
        )
        .expect("compose");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.lifecycle.pending_check_interval_ms, 250);
        assert_eq!(config.lifecycle.host_detection_timeout_ms, 30_000);
        assert_eq!(config.lifecycle.status_ttl_secs, None);
        assert_eq!(
            config.collaborators.task_manager_url.as_ref().map(Url::as_str),
            Some("http://tasks.local:8080/")
        );
        assert!(
            warnings
                .items
                .iter()
                .any(|w| w.message.contains("No load monitor configured"))
        );
    }

    #[test]
    fn environment_beats_file() {
        let file = FileConfig {
            server: FileServerConfig {
                port: Some(9000),
                ..Default::default()
            },
            ..Default::default()
        };
        let env = EnvConfig {
            server_port: Some(9100),
            host_detection_timeout: Some("2m".into()),
            ..Default::default()
        };

        let (config, _) = compose_config(Some(file), env, None, false).expect("compose");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.lifecycle.host_detection_timeout_ms, 120_000);
    }

    #[test]
    fn bad_duration_is_reported_with_field() {
        let env = EnvConfig {
            pending_check_interval: Some("soon".into()),
            ..Default::default()
        };
        let err = compose_config(None, env, None, false).expect_err("invalid duration");
        assert!(matches!(
            err,
            ConfigLoadError::InvalidDuration { field: "pending_check_interval", .. }
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let env = EnvConfig {
            host_detection_timeout: Some("0s".into()),
            ..Default::default()
        };
        assert!(matches!(
            compose_config(None, env, None, false),
            Err(ConfigLoadError::ZeroDuration)
        ));
    }

    #[test]
    fn sub_second_status_ttl_is_rejected() {
        let env = EnvConfig {
            status_ttl: Some("500ms".into()),
            ..Default::default()
        };
        assert!(matches!(
            compose_config(None, env, None, false),
            Err(ConfigLoadError::ZeroDuration)
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        let loader = ConfigLoader::new().with_config_path(&missing);

        let err = loader
            .load_file_config(&EnvConfig::default())
            .expect_err("missing file");
        assert!(matches!(err, ConfigLoadError::MissingConfig { path } if path == missing));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let file = write_config("[server\nport = 1");
        let loader = ConfigLoader::new().with_config_path(file.path());
        assert!(matches!(
            loader.load_file_config(&EnvConfig::default()),
            Err(ConfigLoadError::Parse { .. })
        ));
    }
}
