//! Wiring of inventory, transport and dispatcher from configuration

use std::sync::Arc;

use eyre::Result;
use hostfan_core::{DispatchConfig, Dispatcher};
use hostfan_exec::{SshTransport, TcpProbe};
use hostfan_inventory::StaticInventory;

use crate::config::{ColorChoice, Config};

/// Command-line overrides applied on top of the config file
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub max_parallel: Option<usize>,
    pub color: Option<ColorChoice>,
}

/// Build the inventory, failing on duplicate or incomplete host entries
pub fn inventory(config: &Config) -> Result<StaticInventory> {
    StaticInventory::new(config.host.clone())
        .map_err(|e| eyre::eyre!("invalid host inventory: {e}"))
}

/// Probe used for `ping` and pre-flight checks
pub fn probe(config: &Config) -> TcpProbe {
    TcpProbe::new(config.settings.probe_timeout())
}

/// Build a dispatcher backed by SSH
pub fn dispatcher(config: &Config, overrides: Overrides) -> Result<Dispatcher> {
    let settings = &config.settings;
    let dispatch = DispatchConfig::default()
        .with_max_parallel(overrides.max_parallel.unwrap_or(settings.max_parallel))
        .with_color(overrides.color.unwrap_or(settings.color).enabled());

    Ok(Dispatcher::new(
        Arc::new(inventory(config)?),
        Arc::new(SshTransport::new(settings.connect_timeout())),
        Arc::new(probe(config)),
        dispatch,
    ))
}
