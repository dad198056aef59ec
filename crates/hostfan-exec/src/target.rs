//! Resolved connection descriptors

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::keys::KeySource;

/// A connectable host
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Unique host identity, used for output prefixes and error attribution
    pub name: String,
    /// IP address or hostname for SSH connection
    pub addr: String,
    /// Port (default 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// SSH user (defaults to root)
    #[serde(default = "default_user")]
    pub user: String,
    /// Password for password authentication
    pub password: Option<String>,
    /// Path to SSH private key
    pub ssh_key: Option<String>,
    /// Environment variable holding a base64-encoded private key
    pub ssh_key_env: Option<String>,
    /// Tags for grouping
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_port() -> u16 {
    22
}

fn default_user() -> String {
    "root".to_string()
}

impl Target {
    /// Create a target with default port and user
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            port: default_port(),
            user: default_user(),
            password: None,
            ssh_key: None,
            ssh_key_env: None,
            tags: Vec::new(),
        }
    }

    /// Set SSH user
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set password
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set SSH key path
    #[must_use]
    pub fn with_ssh_key(mut self, path: impl Into<String>) -> Self {
        self.ssh_key = Some(path.into());
        self
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Whether this target belongs to the given group
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Key source for public key authentication, if any
    ///
    /// An explicit path wins over an environment variable.
    #[must_use]
    pub fn key_source(&self) -> Option<KeySource> {
        if let Some(path) = &self.ssh_key {
            return Some(KeySource::Path(expand_home(path)));
        }
        self.ssh_key_env.clone().map(KeySource::Env)
    }

    /// `user@addr:port`
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}@{}:{}", self.user, self.addr, self.port)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("addr", &self.addr)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("ssh_key", &self.ssh_key)
            .field("ssh_key_env", &self.ssh_key_env)
            .field("tags", &self.tags)
            .finish()
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
