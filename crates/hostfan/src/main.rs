//! hostfan
//!
//! Runs shell commands on one host or a tagged group of hosts over SSH,
//! streaming their output to the terminal.

use clap::Parser;
use color_eyre::Result;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod factory;

use cli::{Cli, Commands};
use config::Config;
use factory::Overrides;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let (config, source) = Config::load_default(cli.config.as_deref())?;
    init_tracing(cli.verbosity().unwrap_or(config.settings.log_level.as_str()));

    match &source {
        Some(path) => debug!(path = %path.display(), "loaded configuration"),
        None => warn!("no config file found, using defaults"),
    }

    let code = match cli.command {
        Commands::Exec {
            tag,
            ping,
            max_parallel,
            target,
            command,
        } => {
            let overrides = Overrides {
                max_parallel,
                color: cli.color,
            };
            commands::exec(&config, overrides, target, &command, tag, ping).await?
        }
        Commands::Server { name } => {
            let colored = cli.color.unwrap_or(config.settings.color).enabled();
            commands::server(&config, name.as_deref(), colored)?;
            0
        }
        Commands::Ping { name } => {
            commands::ping(&config, &name).await?;
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Logs go to stderr so they never mix into relayed output
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
