//! Subcommand implementations

use std::fmt::Write as _;

use eyre::Result;
use owo_colors::OwoColorize;
use tracing::info;

use hostfan_core::ExecutionRequest;
use hostfan_exec::{LivenessProbe, Target, host_color};
use hostfan_inventory::Inventory;

use crate::config::Config;
use crate::factory::{self, Overrides};

/// Run a command; returns the process exit code
pub async fn exec(
    config: &Config,
    overrides: Overrides,
    selector: String,
    command: &[String],
    tag: bool,
    ping: bool,
) -> Result<i32> {
    let command = command.join(" ");
    let request = if tag {
        ExecutionRequest::group(command, selector)
    } else {
        ExecutionRequest::single(command, selector)
    }
    .with_liveness_check(ping);

    let dispatcher = factory::dispatcher(config, overrides)?;
    let report = dispatcher.execute(&request).await?;

    Ok(report.exit_code())
}

/// Print the host list, or one host's details
pub fn server(config: &Config, name: Option<&str>, colored: bool) -> Result<()> {
    let inventory = factory::inventory(config)?;

    let text = match name {
        Some(name) => render_detail(&inventory.resolve_by_name(name)?),
        None => render_list(&inventory.list(), colored),
    };
    print!("{text}");
    Ok(())
}

/// Probe one host and report its latency
pub async fn ping(config: &Config, name: &str) -> Result<()> {
    let inventory = factory::inventory(config)?;
    let target = inventory.resolve_by_name(name)?;

    let latency = factory::probe(config).probe(&target).await?;
    info!(host = %target.name, latency = ?latency, "probe succeeded");

    println!(
        "{} ({}:{}) is reachable, {:.1} ms",
        target.name,
        target.addr,
        target.port,
        latency.as_secs_f64() * 1000.0
    );
    Ok(())
}

fn render_list(hosts: &[Target], colored: bool) -> String {
    if hosts.is_empty() {
        return "no hosts configured\n".to_string();
    }

    let name_width = hosts.iter().map(|h| h.name.len()).max().unwrap_or(0).max(4);
    let endpoints: Vec<String> = hosts.iter().map(Target::endpoint).collect();
    let endpoint_width = endpoints.iter().map(String::len).max().unwrap_or(0).max(8);

    let mut out = String::new();
    let _ = writeln!(out, "{:name_width$}  {:endpoint_width$}  TAGS", "NAME", "ENDPOINT");
    for (host, endpoint) in hosts.iter().zip(&endpoints) {
        let name = format!("{:name_width$}", host.name);
        let name = if colored {
            name.color(host_color(&host.name)).to_string()
        } else {
            name
        };
        let _ = writeln!(
            out,
            "{name}  {endpoint:endpoint_width$}  {}",
            host.tags.join(",")
        );
    }
    out
}

fn render_detail(host: &Target) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "name:     {}", host.name);
    let _ = writeln!(out, "address:  {}:{}", host.addr, host.port);
    let _ = writeln!(out, "user:     {}", host.user);
    if host.password.is_some() {
        let _ = writeln!(out, "password: ******");
    }
    if let Some(key) = &host.ssh_key {
        let _ = writeln!(out, "key:      {key}");
    }
    if let Some(var) = &host.ssh_key_env {
        let _ = writeln!(out, "key env:  {var}");
    }
    let _ = writeln!(out, "tags:     {}", host.tags.join(", "));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_list_aligns_columns() {
        let hosts = vec![
            Target::new("web-1", "10.0.0.1").with_tag("web"),
            Target::new("db", "10.0.0.2").with_port(2222),
        ];

        let text = render_list(&hosts, false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "NAME   ENDPOINT            TAGS");
        assert_eq!(lines[1], "web-1  root@10.0.0.1:22    web");
        assert_eq!(lines[2], "db     root@10.0.0.2:2222  ");
    }

    #[test]
    fn test_render_detail_masks_password() {
        let host = Target::new("db", "10.0.0.2").with_password("hunter2");
        let text = render_detail(&host);

        assert!(text.contains("password: ******"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn test_empty_inventory() {
        assert_eq!(render_list(&[], false), "no hosts configured\n");
    }
}
