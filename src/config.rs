//! Application configuration.
//!
//! Loaded from an optional YAML file, then overlaid with `BRRTD_*` environment
//! variables. Every field has a default, so an empty or missing file is valid.
//!
//! ```yaml
//! dispatch:
//!   pool_prewarm: 8
//!   pool_max_idle: 256
//!   max_payload_bytes: 65536
//!   validate: true
//! http:
//!   addr: "0.0.0.0:8080"
//!   path: /zgame
//!   id_field: msg_id
//!   payload_field: msg
//! ```

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dispatcher::DispatcherBuilder;
use crate::pool::PoolOptions;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub dispatch: DispatchConfig,
    pub http: HttpConfig,
}

/// Registry and pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Instances built per pool at registration
    pub pool_prewarm: usize,
    /// Idle instances kept per pool; unset keeps all
    pub pool_max_idle: Option<usize>,
    /// Payloads above this size fail before decoding; unset disables the check
    pub max_payload_bytes: Option<usize>,
    /// Run request validation
    pub validate: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            pool_prewarm: 0,
            pool_max_idle: None,
            max_payload_bytes: Some(1024 * 1024),
            validate: true,
        }
    }
}

impl DispatchConfig {
    #[must_use]
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            prewarm: self.pool_prewarm,
            max_idle: self.pool_max_idle,
        }
    }

    /// Apply these settings to a dispatcher builder.
    #[must_use]
    pub fn apply(&self, mut builder: DispatcherBuilder) -> DispatcherBuilder {
        builder = builder.pool_options(self.pool_options());
        if let Some(limit) = self.max_payload_bytes {
            builder = builder.max_payload_bytes(limit);
        }
        if !self.validate {
            builder = builder.without_validation();
        }
        builder
    }
}

/// HTTP binding settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Listen address
    pub addr: String,
    /// Path of the form-style endpoint
    pub path: String,
    /// Form field carrying the message id
    pub id_field: String,
    /// Form field carrying the JSON payload
    pub payload_field: String,
    /// Longest accepted message id field
    pub max_id_len: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            addr: "127.0.0.1:8080".to_string(),
            path: "/zgame".to_string(),
            id_field: "msg_id".to_string(),
            payload_field: "msg".to_string(),
            max_id_len: 10,
        }
    }
}

impl AppConfig {
    /// Parse YAML text. Blank text yields the defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Failed to parse config YAML")
    }

    /// Read and parse a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// File (if any) plus environment overlay.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay `BRRTD_*` variables from `lookup`.
    ///
    /// Malformed numbers are errors rather than silently ignored, since they come
    /// from an operator.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("BRRTD_POOL_PREWARM") {
            self.dispatch.pool_prewarm = parse_var("BRRTD_POOL_PREWARM", &v)?;
        }
        if let Some(v) = lookup("BRRTD_POOL_MAX_IDLE") {
            self.dispatch.pool_max_idle = Some(parse_var("BRRTD_POOL_MAX_IDLE", &v)?);
        }
        if let Some(v) = lookup("BRRTD_MAX_PAYLOAD_BYTES") {
            let limit: usize = parse_var("BRRTD_MAX_PAYLOAD_BYTES", &v)?;
            self.dispatch.max_payload_bytes = (limit > 0).then_some(limit);
        }
        if let Some(v) = lookup("BRRTD_VALIDATE") {
            self.dispatch.validate = parse_var("BRRTD_VALIDATE", &v)?;
        }
        if let Some(v) = lookup("BRRTD_HTTP_ADDR") {
            self.http.addr = v;
        }
        if let Some(v) = lookup("BRRTD_HTTP_PATH") {
            self.http.path = v;
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {key}: {value:?}"))
}
