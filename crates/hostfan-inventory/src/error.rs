//! Error types for hostfan-inventory

use thiserror::Error;

/// Errors that can occur while resolving targets
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// No host with this name
    #[error("host not found: {0}")]
    HostNotFound(String),

    /// No host carries this tag
    #[error("no hosts tagged {0}")]
    TagNotFound(String),

    /// Two hosts share a name
    #[error("duplicate host name: {0}")]
    DuplicateHost(String),

    /// Host entry is unusable
    #[error("invalid host entry: {0}")]
    InvalidHost(String),
}

impl InventoryError {
    /// Check if the error is a lookup miss rather than a broken inventory
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InventoryError::HostNotFound(_) | InventoryError::TagNotFound(_)
        )
    }
}
