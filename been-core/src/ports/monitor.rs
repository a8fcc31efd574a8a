use async_trait::async_trait;

use crate::error::CollaboratorError;

/// Load monitoring service that samples connected nodes.
#[async_trait]
pub trait LoadMonitor: Send + Sync {
    async fn node_connected(&self, name: &str) -> Result<(), CollaboratorError>;

    async fn node_disconnected(&self, name: &str) -> Result<(), CollaboratorError>;
}
