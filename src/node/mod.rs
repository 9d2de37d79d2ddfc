//! In-process storage node.
//!
//! [`LocalNodeLauncher`] is the default [`NodeLauncher`]. Each node it starts
//! is a single tokio task that owns:
//! - a `sled` store rooted at the node's storage directory,
//! - the REST service (`/health`, `/v1/keys/{key}`) on its REST address,
//! - the selected consensus transport on its RPC address.
//!
//! Both listeners are bound before `launch` returns, so bind failures surface
//! as launch errors rather than as a node that never becomes ready.

mod rest;


use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tonic::async_trait;
use tracing::debug;
use tracing::info;

use crate::ClusterSettings;
use crate::NodeError;
use crate::NodeLauncher;
use crate::NodeResult;
use crate::NodeSpec;
use crate::NodeStatus;
use crate::TransportKind;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalNodeLauncher;

#[async_trait]
impl NodeLauncher for LocalNodeLauncher {
    async fn launch(
        &self,
        spec: NodeSpec,
        settings: Arc<ClusterSettings>,
        shutdown: watch::Receiver<()>,
    ) -> Result<JoinHandle<NodeResult>, NodeError> {
        let transport = settings.validate()?;

        tokio::fs::create_dir_all(&spec.storage_dir).await?;
        let db = sled::Config::new().path(&spec.storage_dir).open()?;

        let rpc_listener = TcpListener::bind(spec.rpc_address).await?;
        let rest_listener = TcpListener::bind(spec.rest_address).await?;

        let node = Arc::new(LocalNode {
            node_id: spec.node_id,
            transport,
            consensus_enabled: settings.consensus_enabled(),
            peers: spec.peers.len(),
            db,
        });
        info!(
            node_id = spec.node_id,
            rest = %spec.rest_address,
            rpc = %spec.rpc_address,
            %transport,
            "local node launched"
        );

        Ok(tokio::spawn(run_node(node, rpc_listener, rest_listener, shutdown)))
    }
}

struct LocalNode {
    node_id: u32,
    transport: TransportKind,
    consensus_enabled: bool,
    peers: usize,
    db: sled::Db,
}

impl LocalNode {
    fn status(&self) -> NodeStatus {
        NodeStatus {
            node_id: self.node_id,
            transport: self.transport,
            consensus_enabled: self.consensus_enabled,
            peers: self.peers,
        }
    }
}

async fn run_node(
    node: Arc<LocalNode>,
    rpc_listener: TcpListener,
    rest_listener: TcpListener,
    shutdown: watch::Receiver<()>,
) -> NodeResult {
    let node_id = node.node_id;
    let served = tokio::try_join!(
        rest::serve(node.clone(), rest_listener, shutdown.clone()),
        node.transport.serve(rpc_listener, shutdown),
    );

    node.db.flush_async().await?;
    debug!(node_id, "local node exiting");
    served.map(|_| ())
}
