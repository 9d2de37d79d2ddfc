//! Error hierarchy for cluster bootstrap.
//!
//! Errors are grouped by the phase that raises them: building the isolated
//! configuration, starting the cluster, and minting clients. Node-level
//! failures raised inside a [`NodeLauncher`](crate::NodeLauncher) are carried
//! by [`NodeError`] and wrapped into [`StartupError`] by the provisioner.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

/// Result of a node task, from launch until it stops.
pub type NodeResult = std::result::Result<(), NodeError>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Storage root setup, settings consistency or config source failures
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// One or more cluster nodes failed to start
    #[error(transparent)]
    Startup(#[from] StartupError),

    /// Malformed endpoint or protocol-level client failure
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// Creating or clearing the isolated storage root failed
    #[error("Failed to prepare storage root {path}: {source}")]
    StorageRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Harness identity cannot be empty")]
    EmptyIdentity,

    #[error("Node count must be at least {minimum}, got {requested}")]
    InvalidNodeCount { requested: usize, minimum: usize },

    #[error("Required setting {0} is missing")]
    MissingSetting(&'static str),

    #[error("Setting {key} has invalid value {value:?}")]
    InvalidSetting { key: &'static str, value: String },

    #[error("Unsupported transport: {0}")]
    UnknownTransport(String),

    /// Consensus-required settings were requested without consensus enabled
    #[error("Consensus must be enabled before a transport can be used")]
    ConsensusDisabled,

    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error("Invalid harness config: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to allocate {requested} local ports: {source}")]
    PortAllocation {
        requested: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Node {index} failed to start: {source}")]
    Node {
        index: usize,
        #[source]
        source: NodeError,
    },

    #[error("Node {index} at {address} was not ready after {waited:?}")]
    Timeout {
        index: usize,
        address: SocketAddr,
        waited: Duration,
    },

    #[error("Node {index} exited before becoming ready: {reason}")]
    Exited { index: usize, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The endpoint cannot be formed into a service base address
    #[error("Invalid URI {endpoint}: {reason}")]
    InvalidUri { endpoint: String, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },
}

/// Failures raised by a running (or launching) storage node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] sled::Error),

    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("{0}")]
    Message(String),
}

impl NodeError {
    pub fn message(msg: impl Into<String>) -> Self {
        NodeError::Message(msg.into())
    }
}
