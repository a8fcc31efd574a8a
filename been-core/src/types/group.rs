use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Named set of hosts kept in the host database.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGroup {
    /// Unique within the database
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Canonical names of member hosts
    #[serde(default)]
    pub hosts: BTreeSet<String>,
}

impl HostGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts.extend(hosts.into_iter().map(Into::into));
        self
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }
}
