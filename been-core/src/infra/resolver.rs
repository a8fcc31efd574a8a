use async_trait::async_trait;
use tracing::debug;

use crate::ports::HostResolver;

/// Resolves names through the system resolver.
///
/// A name counts as resolvable when the lookup yields at least one address;
/// the canonical form is the trimmed, lowercased name.
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsHostResolver;

#[async_trait]
impl HostResolver for DnsHostResolver {
    async fn canonical_name(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        match tokio::net::lookup_host((name, 0)).await {
            Ok(mut addrs) => addrs.next().map(|_| name.to_ascii_lowercase()),
            Err(err) => {
                debug!(host = name, error = %err, "host name did not resolve");
                None
            }
        }
    }
}

/// Accepts any non-blank name as-is. For tests and single-node setups.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughResolver;

#[async_trait]
impl HostResolver for PassthroughResolver {
    async fn canonical_name(&self, name: &str) -> Option<String> {
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}
