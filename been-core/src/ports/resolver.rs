use async_trait::async_trait;

/// Maps a user-supplied host name to its canonical form.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// `None` means the name does not resolve.
    async fn canonical_name(&self, name: &str) -> Option<String>;
}
