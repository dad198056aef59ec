//! In-memory inventory built from configuration

use std::collections::HashMap;

use tracing::debug;

use hostfan_exec::Target;

use crate::error::InventoryError;

/// Resolves host names and tags into targets
///
/// Lookups are synchronous and side-effect free.
pub trait Inventory: Send + Sync {
    /// Resolve exactly one target by exact name
    ///
    /// # Errors
    /// Returns `InventoryError::HostNotFound` for unknown names
    fn resolve_by_name(&self, name: &str) -> Result<Target, InventoryError>;

    /// Resolve every target carrying `tag`, in declaration order
    ///
    /// # Errors
    /// Returns `InventoryError::TagNotFound` when no host carries `tag`
    fn resolve_by_tag(&self, tag: &str) -> Result<Vec<Target>, InventoryError>;

    /// All targets, in declaration order
    fn list(&self) -> Vec<Target>;
}

/// Inventory over a fixed list of hosts
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    hosts: Vec<Target>,
    by_name: HashMap<String, usize>,
}

impl StaticInventory {
    /// Build and validate an inventory
    ///
    /// # Errors
    /// Returns `InventoryError::InvalidHost` for entries without a name or
    /// address and `InventoryError::DuplicateHost` when a name repeats
    pub fn new(hosts: Vec<Target>) -> Result<Self, InventoryError> {
        let mut by_name = HashMap::with_capacity(hosts.len());

        for (idx, host) in hosts.iter().enumerate() {
            if host.name.trim().is_empty() {
                return Err(InventoryError::InvalidHost(format!(
                    "entry #{} has no name",
                    idx + 1
                )));
            }
            if host.addr.trim().is_empty() {
                return Err(InventoryError::InvalidHost(format!(
                    "{} has no address",
                    host.name
                )));
            }
            if by_name.insert(host.name.clone(), idx).is_some() {
                return Err(InventoryError::DuplicateHost(host.name.clone()));
            }
        }

        debug!(hosts = hosts.len(), "inventory loaded");

        Ok(Self { hosts, by_name })
    }

    /// Number of hosts
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether the inventory has no hosts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl Inventory for StaticInventory {
    fn resolve_by_name(&self, name: &str) -> Result<Target, InventoryError> {
        self.by_name
            .get(name)
            .map(|&idx| self.hosts[idx].clone())
            .ok_or_else(|| InventoryError::HostNotFound(name.to_string()))
    }

    fn resolve_by_tag(&self, tag: &str) -> Result<Vec<Target>, InventoryError> {
        let members: Vec<Target> = self
            .hosts
            .iter()
            .filter(|host| host.has_tag(tag))
            .cloned()
            .collect();
        if members.is_empty() {
            return Err(InventoryError::TagNotFound(tag.to_string()));
        }
        Ok(members)
    }

    fn list(&self) -> Vec<Target> {
        self.hosts.clone()
    }
}
