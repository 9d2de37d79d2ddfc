use std::fmt::Debug;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tonic::async_trait;

use crate::ClusterSettings;
use crate::NodeError;
use crate::NodeResult;

/// Everything a launcher needs to bring up one cluster member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    /// Stable position in the cluster; 0 is the front door
    pub index: usize,
    pub node_id: u32,
    /// Consensus transport endpoint
    pub rpc_address: SocketAddr,
    /// Client-facing service endpoint
    pub rest_address: SocketAddr,
    pub storage_dir: PathBuf,
    /// Consensus endpoints of every member, this node included
    pub peers: Vec<SocketAddr>,
}

/// Starts storage nodes on behalf of the provisioner.
///
/// `launch` should return as soon as the node is spawned; the provisioner
/// probes readiness itself. The returned task must finish once `shutdown`
/// changes or its sender is dropped.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NodeLauncher: Debug + Send + Sync + 'static {
    async fn launch(
        &self,
        spec: NodeSpec,
        settings: Arc<ClusterSettings>,
        shutdown: watch::Receiver<()>,
    ) -> Result<JoinHandle<NodeResult>, NodeError>;
}
