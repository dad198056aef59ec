//! Core error types for hostfan-core

use thiserror::Error;

use hostfan_inventory::InventoryError;

/// Errors that abort a whole invocation before any session starts
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Host name or tag could not be resolved
    #[error("resolution failed: {0}")]
    Resolution(#[from] InventoryError),

    /// Signal handlers could not be installed
    #[error("failed to arm cancellation monitor: {0}")]
    Signal(String),
}
