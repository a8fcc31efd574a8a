use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::types::HostGroup;

/// Operator-set metadata attached to a host record.
pub type UserProperties = BTreeMap<String, String>;

/// Persistent host inventory.
///
/// Group methods report a missing group through `Ok(None)` / `Ok(false)`
/// and an invalid change through [`CollaboratorError::Rejected`].
#[async_trait]
pub trait HostDatabase: Send + Sync {
    async fn is_known(&self, name: &str) -> Result<bool, CollaboratorError>;

    async fn insert(
        &self,
        name: &str,
        payload: &[u8],
        encoding: &str,
    ) -> Result<(), CollaboratorError>;

    /// Replaces the scanned record. Implementations may drop user properties.
    async fn update(
        &self,
        name: &str,
        payload: &[u8],
        encoding: &str,
    ) -> Result<(), CollaboratorError>;

    async fn find_user_properties(
        &self,
        name: &str,
    ) -> Result<UserProperties, CollaboratorError>;

    async fn apply_user_properties(
        &self,
        name: &str,
        properties: &UserProperties,
    ) -> Result<(), CollaboratorError>;

    /// Returns whether a record was removed.
    async fn remove(&self, name: &str) -> Result<bool, CollaboratorError>;

    async fn host_names(&self) -> Result<Vec<String>, CollaboratorError>;

    /// Replaces the user properties of a host. `Ok(false)` if the host is unknown.
    async fn update_user_properties(
        &self,
        name: &str,
        properties: &UserProperties,
    ) -> Result<bool, CollaboratorError>;

    async fn find_group(&self, name: &str) -> Result<Option<HostGroup>, CollaboratorError>;

    /// Group names must be unique and every member must be a known host.
    async fn add_group(&self, group: &HostGroup) -> Result<(), CollaboratorError>;

    async fn remove_group(&self, name: &str) -> Result<Option<HostGroup>, CollaboratorError>;

    /// Replaces the group stored under `group.name`.
    async fn update_group(&self, group: &HostGroup) -> Result<bool, CollaboratorError>;

    async fn rename_group(
        &self,
        old_name: &str,
        new_name: &str,
    ) -> Result<bool, CollaboratorError>;

    async fn group_names(&self) -> Result<Vec<String>, CollaboratorError>;
}
