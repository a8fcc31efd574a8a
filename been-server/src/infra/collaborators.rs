//! HTTP clients for the task manager and the load monitor.

use std::time::Duration;

use async_trait::async_trait;
use been_core::CollaboratorError;
use been_core::ports::{LoadMonitor, TaskDescriptor, TaskExecution};
use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Guarantees `Url::join` appends below the base path instead of replacing
/// its last segment.
fn normalize_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn endpoint(base: &Url, path: &str) -> Result<Url, CollaboratorError> {
    base.join(path)
        .map_err(|err| CollaboratorError::Rejected(format!("invalid endpoint {path}: {err}")))
}

fn transport(err: reqwest::Error) -> CollaboratorError {
    CollaboratorError::Transport(err.to_string())
}

async fn check_status(service: &str, response: Response) -> Result<Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = body.trim();
    Err(CollaboratorError::Rejected(if detail.is_empty() {
        format!("{service} answered {status}")
    } else {
        format!("{service} answered {status}: {detail}")
    }))
}

/// Task manager reached over HTTP.
///
/// `POST {base}/tasks` submits a descriptor and `GET {base}/host-runtimes`
/// lists registered runtimes.
#[derive(Debug, Clone)]
pub struct HttpTaskExecution {
    client: Client,
    base: Url,
}

impl HttpTaskExecution {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            base: normalize_base(base),
        })
    }
}

#[async_trait]
impl TaskExecution for HttpTaskExecution {
    async fn submit(&self, task: TaskDescriptor) -> Result<(), CollaboratorError> {
        let url = endpoint(&self.base, "tasks")?;
        debug!(task = %task.task_id, host = %task.host_name, %url, "submitting task");
        let response = self
            .client
            .post(url)
            .json(&task)
            .send()
            .await
            .map_err(transport)?;
        check_status("task manager", response).await?;
        Ok(())
    }

    async fn registered_host_runtimes(&self) -> Result<Vec<String>, CollaboratorError> {
        let url = endpoint(&self.base, "host-runtimes")?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        check_status("task manager", response)
            .await?
            .json::<Vec<String>>()
            .await
            .map_err(transport)
    }
}

/// Load monitor reached over HTTP at `{base}/nodes/{name}/connected` and
/// `{base}/nodes/{name}/disconnected`.
#[derive(Debug, Clone)]
pub struct HttpLoadMonitor {
    client: Client,
    base: Url,
}

impl HttpLoadMonitor {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            base: normalize_base(base),
        })
    }

    async fn notify(&self, name: &str, action: &str) -> Result<(), CollaboratorError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CollaboratorError::Rejected("load monitor URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["nodes", name, action]);
        let response = self.client.post(url).send().await.map_err(transport)?;
        check_status("load monitor", response).await?;
        Ok(())
    }
}

#[async_trait]
impl LoadMonitor for HttpLoadMonitor {
    async fn node_connected(&self, name: &str) -> Result<(), CollaboratorError> {
        self.notify(name, "connected").await
    }

    async fn node_disconnected(&self, name: &str) -> Result<(), CollaboratorError> {
        self.notify(name, "disconnected").await
    }
}

/// Stand-in used when no task manager URL is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredTaskExecution;

#[async_trait]
impl TaskExecution for UnconfiguredTaskExecution {
    async fn submit(&self, _task: TaskDescriptor) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Rejected("no task manager configured".into()))
    }

    async fn registered_host_runtimes(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(Vec::new())
    }
}

/// Stand-in used when no load monitor URL is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredLoadMonitor;

#[async_trait]
impl LoadMonitor for UnconfiguredLoadMonitor {
    async fn node_connected(&self, _name: &str) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Rejected("no load monitor configured".into()))
    }

    async fn node_disconnected(&self, _name: &str) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Rejected("no load monitor configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_without_slash_keeps_its_path() {
        let base = normalize_base(Url::parse("http://tm.local:8080/api").expect("url"));
        let url = endpoint(&base, "tasks").expect("join");
        assert_eq!(url.as_str(), "http://tm.local:8080/api/tasks");
    }
}
