//! Wiring from a loaded [`Config`] to a running controller.

use std::sync::Arc;

use anyhow::Context;
use been_core::infra::{DnsHostResolver, InMemoryHostDatabase, PassthroughResolver};
use been_core::ports::{HostResolver, LoadMonitor, TaskExecution};
use been_core::{LifecycleCollaborators, NodeLifecycleController};
use tracing::info;

use super::collaborators::{
    HttpLoadMonitor, HttpTaskExecution, UnconfiguredLoadMonitor, UnconfiguredTaskExecution,
};
use super::config::Config;

pub fn build_collaborators(config: &Config) -> anyhow::Result<LifecycleCollaborators> {
    let timeout = config.collaborators.request_timeout;

    let tasks: Arc<dyn TaskExecution> = match &config.collaborators.task_manager_url {
        Some(url) => {
            info!(%url, "using HTTP task manager");
            Arc::new(
                HttpTaskExecution::new(url.clone(), timeout)
                    .context("failed to build task manager client")?,
            )
        }
        None => Arc::new(UnconfiguredTaskExecution),
    };

    let monitor: Arc<dyn LoadMonitor> = match &config.collaborators.load_monitor_url {
        Some(url) => {
            info!(%url, "using HTTP load monitor");
            Arc::new(
                HttpLoadMonitor::new(url.clone(), timeout)
                    .context("failed to build load monitor client")?,
            )
        }
        None => Arc::new(UnconfiguredLoadMonitor),
    };

    let resolver: Arc<dyn HostResolver> = if config.server.resolve_host_names {
        Arc::new(DnsHostResolver)
    } else {
        Arc::new(PassthroughResolver)
    };

    Ok(LifecycleCollaborators {
        database: Arc::new(InMemoryHostDatabase::new()),
        tasks,
        monitor,
        resolver,
    })
}

pub fn start_controller(config: &Config) -> anyhow::Result<Arc<NodeLifecycleController>> {
    let collaborators = build_collaborators(config)?;
    NodeLifecycleController::start(&config.lifecycle, collaborators)
        .context("failed to start node lifecycle controller")
}
