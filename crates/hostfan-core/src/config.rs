//! Dispatch configuration

use std::num::NonZeroUsize;

/// Tuning for one dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Upper bound on concurrently running hosts in group mode
    ///
    /// `None` starts every host at once.
    pub max_parallel: Option<NonZeroUsize>,
    /// Paint host prefixes in group output
    pub colored: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_parallel: None,
            colored: true,
        }
    }
}

impl DispatchConfig {
    /// Limit concurrency; zero means unbounded
    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = NonZeroUsize::new(max_parallel);
        self
    }

    /// Enable or disable colored prefixes
    #[must_use]
    pub fn with_color(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }
}
