//! hostfan-inventory: Host and tag resolution
//!
//! Turns a host name or a group tag into connectable targets.

pub mod error;
pub mod registry;

pub use error::InventoryError;
pub use registry::{Inventory, StaticInventory};
