//! Command-line arguments

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::ColorChoice;

#[derive(Debug, Parser)]
#[command(name = "hostfan", version)]
#[command(about = "Run shell commands on one host or a tagged group of hosts over SSH", long_about = None)]
pub struct Cli {
    /// Path to hostfan.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Color host prefixes in group output
    #[arg(long, value_enum, global = true)]
    pub color: Option<ColorChoice>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a command on a host, or on every host carrying a tag
    #[command(visible_alias = "mcx")]
    Exec {
        /// Treat TARGET as a tag and run on every host carrying it
        #[arg(short, long)]
        tag: bool,

        /// Check the host is reachable before connecting (single host only)
        #[arg(long)]
        ping: bool,

        /// Hosts run at once in tag mode (0 runs all of them)
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Host name, or tag with --tag
        target: String,

        /// Command to run remotely
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// List hosts, or show one host in detail
    #[command(visible_alias = "mcs")]
    Server {
        /// Host to show
        name: Option<String>,
    },

    /// Check that a host's SSH port accepts connections
    #[command(visible_alias = "mping")]
    Ping {
        /// Host to probe
        name: String,
    },
}

impl Cli {
    /// Log filter implied by `-v` flags, if any were given
    #[must_use]
    pub fn verbosity(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("info"),
            2 => Some("debug"),
            _ => Some("trace"),
        }
    }
}
