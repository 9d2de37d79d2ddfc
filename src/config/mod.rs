//! Configuration for test clusters.
//!
//! Two layers live here:
//! - [`ClusterSettings`]: the keyed settings object every cluster member shares, produced per test
//!   by [`ConfigurationBuilder`].
//! - [`HarnessConfig`]: ambient knobs of the harness itself (node count, transport, timeouts),
//!   loaded hierarchically:
//!   1. Default values (hardcoded)
//!   2. File named by `MINICLUSTER_CONFIG_PATH`
//!   3. Environment variables prefixed `MINICLUSTER__` (highest priority)

mod builder;
mod settings;
pub use builder::*;
pub use settings::*;


//---
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::ConfigurationError;
use crate::TransportKind;

/// Smallest cluster the provisioner accepts; a single voter is its own majority.
pub const MIN_NODE_COUNT: usize = 1;

/// Three members tolerate one failure while keeping a quorum.
pub const DEFAULT_NODE_COUNT: usize = 3;

const CONFIG_PATH_ENV: &str = "MINICLUSTER_CONFIG_PATH";
const ENV_PREFIX: &str = "MINICLUSTER";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HarnessConfig {
    #[serde(default = "default_node_count")]
    pub node_count: usize,

    #[serde(default)]
    pub transport: TransportKind,

    /// Parent of every per-identity storage root
    #[serde(default = "default_storage_base_dir")]
    pub storage_base_dir: PathBuf,

    /// Upper bound for a single node to become ready
    #[serde(default = "default_startup_timeout_in_ms")]
    pub startup_timeout_in_ms: u64,

    #[serde(default = "default_ready_poll_interval_in_ms")]
    pub ready_poll_interval_in_ms: u64,

    /// Grace period for a node to stop before its task is aborted
    #[serde(default = "default_shutdown_timeout_in_ms")]
    pub shutdown_timeout_in_ms: u64,

    /// Remove the storage root once the cluster is shut down
    #[serde(default)]
    pub cleanup_storage_on_shutdown: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            node_count: default_node_count(),
            transport: TransportKind::default(),
            storage_base_dir: default_storage_base_dir(),
            startup_timeout_in_ms: default_startup_timeout_in_ms(),
            ready_poll_interval_in_ms: default_ready_poll_interval_in_ms(),
            shutdown_timeout_in_ms: default_shutdown_timeout_in_ms(),
            cleanup_storage_on_shutdown: false,
        }
    }
}

impl HarnessConfig {
    /// Loads defaults, then the optional config file, then environment
    /// overrides. Validation is deferred to [`validate`](Self::validate).
    pub fn new() -> Result<Self, ConfigurationError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Merges `path` over the current values; environment variables still win.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self, ConfigurationError> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn validate(self) -> Result<Self, ConfigurationError> {
        if self.node_count < MIN_NODE_COUNT {
            return Err(ConfigurationError::InvalidNodeCount {
                requested: self.node_count,
                minimum: MIN_NODE_COUNT,
            });
        }
        if self.storage_base_dir.as_os_str().is_empty() {
            return Err(ConfigurationError::Invalid(
                "storage_base_dir cannot be empty".into(),
            ));
        }
        if self.startup_timeout_in_ms == 0 {
            return Err(ConfigurationError::Invalid(
                "startup_timeout_in_ms must be greater than 0".into(),
            ));
        }
        if self.ready_poll_interval_in_ms == 0 || self.ready_poll_interval_in_ms > self.startup_timeout_in_ms {
            return Err(ConfigurationError::Invalid(format!(
                "ready_poll_interval_in_ms must be within 1..={}",
                self.startup_timeout_in_ms
            )));
        }
        Ok(self)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_in_ms)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_in_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_in_ms)
    }
}

fn default_node_count() -> usize {
    DEFAULT_NODE_COUNT
}
fn default_storage_base_dir() -> PathBuf {
    env::temp_dir().join("raft-minicluster")
}
fn default_startup_timeout_in_ms() -> u64 {
    10_000
}
fn default_ready_poll_interval_in_ms() -> u64 {
    50
}
fn default_shutdown_timeout_in_ms() -> u64 {
    5_000
}
