use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::CollaboratorError;
use crate::ports::{HostDatabase, UserProperties};
use crate::types::HostGroup;

/// Stored scan data for one host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostRecord {
    pub payload: Vec<u8>,
    pub encoding: String,
    pub user_properties: UserProperties,
}

/// Host inventory kept in process memory.
///
/// `update` replaces the whole record, user properties included, the same
/// way the on-disk store does. Removing a host also drops it from every
/// group. Locks are always taken hosts first, then groups.
#[derive(Debug, Default)]
pub struct InMemoryHostDatabase {
    hosts: RwLock<BTreeMap<String, HostRecord>>,
    groups: RwLock<BTreeMap<String, HostGroup>>,
}

impl InMemoryHostDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) -> Option<HostRecord> {
        self.hosts.read().get(name).cloned()
    }

    /// Sets one user property directly, bypassing the controller.
    pub fn set_user_property(&self, name: &str, key: &str, value: &str) -> bool {
        match self.hosts.write().get_mut(name) {
            Some(record) => {
                record
                    .user_properties
                    .insert(key.to_string(), value.to_string());
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl HostDatabase for InMemoryHostDatabase {
    async fn is_known(&self, name: &str) -> Result<bool, CollaboratorError> {
        Ok(self.hosts.read().contains_key(name))
    }

    async fn insert(
        &self,
        name: &str,
        payload: &[u8],
        encoding: &str,
    ) -> Result<(), CollaboratorError> {
        let mut hosts = self.hosts.write();
        if hosts.contains_key(name) {
            return Err(CollaboratorError::Rejected(format!(
                "host {name} is already in the database"
            )));
        }
        hosts.insert(
            name.to_string(),
            HostRecord {
                payload: payload.to_vec(),
                encoding: encoding.to_string(),
                user_properties: UserProperties::new(),
            },
        );
        Ok(())
    }

    async fn update(
        &self,
        name: &str,
        payload: &[u8],
        encoding: &str,
    ) -> Result<(), CollaboratorError> {
        let mut hosts = self.hosts.write();
        let record = hosts
            .get_mut(name)
            .ok_or_else(|| CollaboratorError::Rejected(format!("host {name} not found")))?;
        *record = HostRecord {
            payload: payload.to_vec(),
            encoding: encoding.to_string(),
            user_properties: UserProperties::new(),
        };
        Ok(())
    }

    async fn find_user_properties(
        &self,
        name: &str,
    ) -> Result<UserProperties, CollaboratorError> {
        self.hosts
            .read()
            .get(name)
            .map(|record| record.user_properties.clone())
            .ok_or_else(|| CollaboratorError::Rejected(format!("host {name} not found")))
    }

    async fn apply_user_properties(
        &self,
        name: &str,
        properties: &UserProperties,
    ) -> Result<(), CollaboratorError> {
        let mut hosts = self.hosts.write();
        let record = hosts
            .get_mut(name)
            .ok_or_else(|| CollaboratorError::Rejected(format!("host {name} not found")))?;
        record
            .user_properties
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<bool, CollaboratorError> {
        let mut hosts = self.hosts.write();
        if hosts.remove(name).is_none() {
            return Ok(false);
        }
        for group in self.groups.write().values_mut() {
            group.hosts.remove(name);
        }
        Ok(true)
    }

    async fn host_names(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.hosts.read().keys().cloned().collect())
    }

    async fn update_user_properties(
        &self,
        name: &str,
        properties: &UserProperties,
    ) -> Result<bool, CollaboratorError> {
        match self.hosts.write().get_mut(name) {
            Some(record) => {
                record.user_properties = properties.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_group(&self, name: &str) -> Result<Option<HostGroup>, CollaboratorError> {
        Ok(self.groups.read().get(name).cloned())
    }

    async fn add_group(&self, group: &HostGroup) -> Result<(), CollaboratorError> {
        let hosts = self.hosts.read();
        check_group(group, &hosts)?;
        let mut groups = self.groups.write();
        if groups.contains_key(&group.name) {
            return Err(CollaboratorError::Rejected(format!(
                "Duplicate group name \"{}\".",
                group.name
            )));
        }
        groups.insert(group.name.clone(), group.clone());
        Ok(())
    }

    async fn remove_group(&self, name: &str) -> Result<Option<HostGroup>, CollaboratorError> {
        Ok(self.groups.write().remove(name))
    }

    async fn update_group(&self, group: &HostGroup) -> Result<bool, CollaboratorError> {
        let hosts = self.hosts.read();
        check_group(group, &hosts)?;
        match self.groups.write().get_mut(&group.name) {
            Some(stored) => {
                *stored = group.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rename_group(
        &self,
        old_name: &str,
        new_name: &str,
    ) -> Result<bool, CollaboratorError> {
        if new_name.trim().is_empty() {
            return Err(CollaboratorError::Rejected("Group name must not be empty.".into()));
        }
        let mut groups = self.groups.write();
        if !groups.contains_key(old_name) {
            return Ok(false);
        }
        if groups.contains_key(new_name) {
            return Err(CollaboratorError::Rejected(format!(
                "Unable to rename \"{old_name}\" to \"{new_name}\". \
                 Group with new name already exists."
            )));
        }
        if let Some(mut group) = groups.remove(old_name) {
            group.name = new_name.to_string();
            groups.insert(group.name.clone(), group);
        }
        Ok(true)
    }

    async fn group_names(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.groups.read().keys().cloned().collect())
    }
}

fn check_group(
    group: &HostGroup,
    hosts: &BTreeMap<String, HostRecord>,
) -> Result<(), CollaboratorError> {
    if group.name.trim().is_empty() {
        return Err(CollaboratorError::Rejected("Group name must not be empty.".into()));
    }
    if let Some(missing) = group.hosts.iter().find(|host| !hosts.contains_key(*host)) {
        return Err(CollaboratorError::Rejected(format!(
            "Group \"{}\" refers to unknown host \"{missing}\".",
            group.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_drops_properties_until_reapplied() {
        let db = InMemoryHostDatabase::new();
        db.insert("n1", b"v1", "xml").await.expect("insert");
        assert!(db.set_user_property("n1", "rack", "r7"));

        let saved = db.find_user_properties("n1").await.expect("props");
        db.update("n1", b"v2", "xml").await.expect("update");
        assert!(db.record("n1").expect("record").user_properties.is_empty());

        db.apply_user_properties("n1", &saved).await.expect("apply");
        let record = db.record("n1").expect("record");
        assert_eq!(record.payload, b"v2");
        assert_eq!(record.user_properties.get("rack").map(String::as_str), Some("r7"));
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let db = InMemoryHostDatabase::new();
        db.insert("n1", b"v1", "xml").await.expect("insert");
        assert!(matches!(
            db.insert("n1", b"v1", "xml").await,
            Err(CollaboratorError::Rejected(_))
        ));
        assert!(db.remove("n1").await.expect("remove"));
        assert!(!db.remove("n1").await.expect("remove again"));
    }

    #[tokio::test]
    async fn groups_follow_host_removal() {
        let db = InMemoryHostDatabase::new();
        db.insert("n1", b"v1", "xml").await.expect("insert n1");
        db.insert("n2", b"v1", "xml").await.expect("insert n2");
        db.add_group(&HostGroup::new("rack-a").with_hosts(["n1", "n2"]))
            .await
            .expect("add group");

        assert!(db.remove("n1").await.expect("remove"));
        let group = db.find_group("rack-a").await.expect("find").expect("group");
        assert!(!group.contains("n1"));
        assert!(group.contains("n2"));
    }

    #[tokio::test]
    async fn group_changes_are_validated() {
        let db = InMemoryHostDatabase::new();
        db.insert("n1", b"v1", "xml").await.expect("insert");

        assert!(matches!(
            db.add_group(&HostGroup::new("g").with_hosts(["ghost"])).await,
            Err(CollaboratorError::Rejected(_))
        ));
        db.add_group(&HostGroup::new("g")).await.expect("add");
        db.add_group(&HostGroup::new("h")).await.expect("add second");
        assert!(matches!(
            db.add_group(&HostGroup::new("g")).await,
            Err(CollaboratorError::Rejected(_))
        ));
        assert!(matches!(
            db.rename_group("g", "h").await,
            Err(CollaboratorError::Rejected(_))
        ));
        assert!(!db.rename_group("missing", "x").await.expect("rename missing"));
        assert!(db.rename_group("g", "renamed").await.expect("rename"));
        assert_eq!(
            db.group_names().await.expect("names"),
            vec!["h".to_string(), "renamed".to_string()]
        );
        assert!(!db.update_group(&HostGroup::new("g")).await.expect("update gone"));
    }

    #[tokio::test]
    async fn user_properties_are_replaced() {
        let db = InMemoryHostDatabase::new();
        db.insert("n1", b"v1", "xml").await.expect("insert");
        assert!(db.set_user_property("n1", "rack", "r7"));

        let props = UserProperties::from([("owner".to_string(), "perf".to_string())]);
        assert!(db.update_user_properties("n1", &props).await.expect("update"));
        assert_eq!(db.record("n1").expect("record").user_properties, props);
        assert!(!db.update_user_properties("n9", &props).await.expect("unknown"));
    }
}
