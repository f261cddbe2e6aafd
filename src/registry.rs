//! Name to group lookup.
//!
//! A [`Registry`] owns every [`Group`] of a node. Groups are created at
//! startup and read for every peer request, so the map sits behind a
//! read/write lock and lookups hand out `Arc<Group>` clones instead of
//! holding the lock while a request is served.

use std::sync::Arc;

use parking_lot::RwLock;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

use crate::config::GroupConfig;
use crate::error::{Error, Result};
use crate::group::{Getter, Group};

/// The set of groups known to a node.
///
/// # Example
///
/// ```
/// use peercache::config::GroupConfig;
/// use peercache::group::getter_fn;
/// use peercache::Registry;
///
/// let registry = Registry::new();
/// registry
///     .new_group(GroupConfig::new("scores"), getter_fn(|_| Ok(b"0".to_vec())))
///     .unwrap();
///
/// assert!(registry.get_group("scores").is_some());
/// assert!(registry.get_group("unknown").is_none());
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group and registers it under its configured name.
    ///
    /// Returns [`Error::DuplicateGroup`] if the name is taken.
    pub fn new_group(
        &self,
        config: GroupConfig,
        getter: impl Getter + 'static,
    ) -> Result<Arc<Group>> {
        let mut groups = self.groups.write();
        if groups.contains_key(&config.name) {
            return Err(Error::DuplicateGroup(config.name));
        }
        let group = Arc::new(Group::new(config, getter));
        groups.insert(group.name().to_string(), Arc::clone(&group));
        Ok(group)
    }

    /// Looks up a group by name.
    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Names of all registered groups, sorted.
    pub fn groups(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Unregisters a group. Callers already holding it keep a working handle.
    pub fn remove_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.write().remove(name)
    }
}
