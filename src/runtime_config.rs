//! # Runtime Configuration Module
//!
//! Coroutine runtime knobs read from the environment.
//!
//! The HTTP binding runs every request on a `may` coroutine, and each dispatch
//! (decode, plugins, handler, encode) runs on that coroutine's stack. These
//! settings are applied to the global `may` configuration before the server
//! starts.
//!
//! ## Environment Variables
//!
//! ### `BRRTD_STACK_SIZE`
//!
//! Coroutine stack size in bytes, decimal (`16384`) or hex (`0x4000`).
//! Default: `0x4000` (16 KB). Handlers with deep call chains or large locals
//! need more; total virtual memory is roughly stack size × concurrent requests.
//!
//! ### `BRRTD_WORKERS`
//!
//! Number of scheduler threads. Default: the number of CPUs `may` detects.
//!
//! ```rust
//! use brrtdispatch::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_lookup(|key| match key {
//!     "BRRTD_STACK_SIZE" => Some("0x8000".to_string()),
//!     _ => None,
//! });
//! assert_eq!(config.stack_size, 0x8000);
//! ```

use std::env;

/// Default coroutine stack size (16 KB)
pub const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Coroutine stack size in bytes
    pub stack_size: usize,
    /// Scheduler threads; `None` keeps the `may` default
    pub workers: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_size: DEFAULT_STACK_SIZE,
            workers: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unset or unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let stack_size = lookup("BRRTD_STACK_SIZE")
            .and_then(|val| parse_size(&val))
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_STACK_SIZE);
        let workers = lookup("BRRTD_WORKERS")
            .and_then(|val| val.trim().parse().ok())
            .filter(|n: &usize| *n > 0);
        RuntimeConfig {
            stack_size,
            workers,
        }
    }

    /// Push the settings into the global `may` configuration.
    pub fn apply(&self) {
        let config = may::config();
        config.set_stack_size(self.stack_size);
        if let Some(workers) = self.workers {
            config.set_workers(workers);
        }
    }
}

/// Parse `0x`-prefixed hex or plain decimal.
pub fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}
