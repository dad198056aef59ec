//! Configuration loading and types

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use hostfan_exec::Target;

/// Top-level configuration read from `hostfan.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Execution settings
    #[serde(default)]
    pub settings: Settings,
    /// Host inventory
    #[serde(default)]
    pub host: Vec<Target>,
}

/// Execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Hosts run at once in group mode; 0 runs all of them
    pub max_parallel: usize,
    /// Seconds to wait for an SSH handshake
    pub connect_timeout_secs: u64,
    /// Seconds to wait for the liveness probe
    pub probe_timeout_secs: u64,
    /// Prefix coloring for group output
    pub color: ColorChoice,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            max_parallel: 0,
            connect_timeout_secs: 10,
            probe_timeout_secs: 3,
            color: ColorChoice::Auto,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// When to paint host prefixes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    /// Color when stdout is a terminal and `NO_COLOR` is unset
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Resolve against the environment
    #[must_use]
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::io::stdout().is_terminal()
                    && std::env::var_os("NO_COLOR").is_none()
                    && std::env::var("TERM").map_or(true, |term| term != "dumb")
            }
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("failed to read {}: {e}", path.display()))?;
        Self::parse(&content).map_err(|e| eyre::eyre!("failed to parse {}: {e}", path.display()))
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not a valid configuration
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from an explicit path, the environment, or default paths
    ///
    /// Returns the path the configuration came from, or `None` when no file
    /// was found and defaults are used.
    ///
    /// # Errors
    /// Returns error if a config file exists but cannot be loaded
    pub fn load_default(explicit: Option<&Path>) -> eyre::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        if let Ok(path) = std::env::var("HOSTFAN_CONFIG") {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, Some(path)));
        }

        let paths = [
            Some(PathBuf::from("hostfan.toml")),
            dirs::config_dir().map(|p| p.join("hostfan/hostfan.toml")),
            Some(PathBuf::from("/etc/hostfan/hostfan.toml")),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists() {
                return Ok((Self::load(&path)?, Some(path)));
            }
        }

        Ok((Config::default(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [settings]
            log_level = "debug"
            max_parallel = 16
            color = "never"

            [[host]]
            name = "web-1"
            addr = "10.0.0.1"
            ssh_key = "~/.ssh/id_ed25519"
            tags = ["web", "prod"]

            [[host]]
            name = "db-1"
            addr = "10.0.0.2"
            user = "postgres"
            password = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.settings.max_parallel, 16);
        assert_eq!(config.settings.connect_timeout_secs, 10);
        assert_eq!(config.settings.color, ColorChoice::Never);
        assert_eq!(config.host.len(), 2);
        assert!(config.host[0].has_tag("prod"));
        assert_eq!(config.host[1].user, "postgres");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.settings, Settings::default());
        assert!(config.host.is_empty());
    }

    #[test]
    fn test_unknown_color_rejected() {
        assert!(Config::parse("[settings]\ncolor = \"sometimes\"\n").is_err());
    }

    #[test]
    fn test_explicit_color_choices() {
        assert!(ColorChoice::Always.enabled());
        assert!(!ColorChoice::Never.enabled());
    }
}
