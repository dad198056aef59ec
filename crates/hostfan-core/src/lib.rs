//! hostfan-core: Fan-out/fan-in execution
//!
//! Implements the `Dispatcher`, which resolves a host or tag, runs one
//! session per target, and collects one `Outcome` per host, and the
//! `CancellationMonitor`, which turns termination signals into cancellation.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod monitor;
pub mod request;

pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
pub use error::CoreError;
pub use monitor::CancellationMonitor;
pub use request::{ExecutionReport, ExecutionRequest, Mode};
