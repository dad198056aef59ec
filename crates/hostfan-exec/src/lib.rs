//! hostfan-exec: Remote execution of one command on one host
//!
//! Provides the transport seams, an SSH transport, output sinks for the
//! shared terminal, and the session runner that ties them together.

pub mod error;
pub mod keys;
pub mod output;
pub mod probe;
pub mod result;
pub mod runner;
pub mod ssh;
pub mod target;
pub mod traits;

pub use error::{ExecError, FailureKind};
pub use keys::{KeyError, KeySource, ResolvedKey};
pub use output::{ColorLine, OutputMode, OutputSink, PrefixedSink, RawSink, Terminal, host_color};
pub use probe::TcpProbe;
pub use result::Outcome;
pub use runner::SessionRunner;
pub use ssh::SshTransport;
pub use target::Target;
pub use traits::{Connection, LivenessProbe, OutputStream, RemoteSession, Transport};
