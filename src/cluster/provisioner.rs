use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::ports::allocate_ports;
use super::NodeHandle;
use super::NodeLauncher;
use super::NodeSpec;
use crate::ClusterSettings;
use crate::ConfigurationError;
use crate::EventSink;
use crate::HarnessConfig;
use crate::HarnessEvent;
use crate::Result;
use crate::StartupError;
use crate::TracingSink;
use crate::TransportKind;
use crate::DEFAULT_NODE_COUNT;
use crate::MIN_NODE_COUNT;

/// Index of the node clients are bound to. It is a convention of the harness,
/// not the consensus leader.
pub const FRONT_DOOR_INDEX: usize = 0;

/// A running set of storage nodes in stable index order.
///
/// Stopped exactly once: by [`shutdown`](Cluster::shutdown) or, failing that,
/// when dropped.
#[derive(Debug)]
pub struct Cluster {
    nodes: Vec<NodeHandle>,
    running: AtomicBool,
    shutdown_timeout: Duration,
    sink: Arc<dyn EventSink>,
}

impl Cluster {
    pub fn builder(
        settings: Arc<ClusterSettings>,
        launcher: Arc<dyn NodeLauncher>,
    ) -> ClusterBuilder {
        ClusterBuilder::new(settings, launcher)
    }

    pub fn nodes(&self) -> &[NodeHandle] {
        &self.nodes
    }

    pub fn node(
        &self,
        index: usize,
    ) -> Option<&NodeHandle> {
        self.nodes.get(index)
    }

    /// The node clients are bound to.
    pub fn front_door(&self) -> &NodeHandle {
        // A cluster always holds at least MIN_NODE_COUNT nodes
        &self.nodes[FRONT_DOOR_INDEX]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stops every node. Safe to call any number of times; only the first
    /// call does any work and no call fails.
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            debug!("cluster already stopped");
            return;
        }

        for node in self.nodes.iter().rev() {
            node.stop(self.shutdown_timeout).await;
        }
        self.sink.record(HarnessEvent::ClusterStopped {
            nodes: self.nodes.len(),
        });
    }

    /// Signals and aborts every node without waiting.
    pub(crate) fn halt(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        warn!(nodes = self.nodes.len(), "cluster dropped while running, aborting nodes");
        for node in &self.nodes {
            node.halt();
        }
        self.sink.record(HarnessEvent::ClusterStopped {
            nodes: self.nodes.len(),
        });
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Assembles and starts a [`Cluster`].
///
/// ```ignore
/// let cluster = Cluster::builder(settings, Arc::new(LocalNodeLauncher))
///     .node_count(3)
///     .startup_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
/// ```
pub struct ClusterBuilder {
    settings: Arc<ClusterSettings>,
    launcher: Arc<dyn NodeLauncher>,
    node_count: usize,
    startup_timeout: Duration,
    ready_poll_interval: Duration,
    shutdown_timeout: Duration,
    sink: Arc<dyn EventSink>,
}

impl ClusterBuilder {
    pub fn new(
        settings: Arc<ClusterSettings>,
        launcher: Arc<dyn NodeLauncher>,
    ) -> Self {
        let defaults = HarnessConfig::default();
        Self {
            settings,
            launcher,
            node_count: DEFAULT_NODE_COUNT,
            startup_timeout: defaults.startup_timeout(),
            ready_poll_interval: defaults.ready_poll_interval(),
            shutdown_timeout: defaults.shutdown_timeout(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn node_count(
        mut self,
        node_count: usize,
    ) -> Self {
        self.node_count = node_count;
        self
    }

    /// Upper bound for each node to become ready
    pub fn startup_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn ready_poll_interval(
        mut self,
        interval: Duration,
    ) -> Self {
        self.ready_poll_interval = interval;
        self
    }

    pub fn shutdown_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn sink(
        mut self,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        self.sink = sink;
        self
    }

    /// Starts every node in index order and returns once all are ready.
    ///
    /// On any failure the nodes started so far are stopped before the error
    /// is returned, so a failed build leaves nothing running.
    pub async fn build(self) -> Result<Cluster> {
        if self.node_count < MIN_NODE_COUNT {
            return Err(ConfigurationError::InvalidNodeCount {
                requested: self.node_count,
                minimum: MIN_NODE_COUNT,
            }
            .into());
        }
        let transport = self.settings.validate()?;
        let specs = self.node_specs()?;

        let mut nodes: Vec<NodeHandle> = Vec::with_capacity(specs.len());
        for spec in specs {
            let index = spec.index;
            match self.start_node(spec, transport).await {
                Ok(node) => {
                    self.sink.record(HarnessEvent::NodeStarted {
                        index,
                        rest_address: node.rest_address(),
                    });
                    nodes.push(node);
                }
                Err(e) => {
                    error!(index, "node failed to start: {e}");
                    self.rollback(nodes).await;
                    return Err(e.into());
                }
            }
        }

        info!(nodes = nodes.len(), %transport, "cluster is ready");
        Ok(Cluster {
            nodes,
            running: AtomicBool::new(true),
            shutdown_timeout: self.shutdown_timeout,
            sink: self.sink,
        })
    }

    fn node_specs(&self) -> Result<Vec<NodeSpec>> {
        let storage_root = self.settings.storage_root()?;
        let requested = self.node_count * 2;
        let ports =
            allocate_ports(requested).map_err(|source| StartupError::PortAllocation { requested, source })?;
        let (rpc_ports, rest_ports) = ports.split_at(self.node_count);

        let loopback = |port: u16| SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let peers: Vec<SocketAddr> = rpc_ports.iter().copied().map(loopback).collect();

        Ok((0..self.node_count)
            .map(|index| {
                let node_id = index as u32 + 1;
                NodeSpec {
                    index,
                    node_id,
                    rpc_address: peers[index],
                    rest_address: loopback(rest_ports[index]),
                    storage_dir: storage_root.join(format!("node-{node_id}")),
                    peers: peers.clone(),
                }
            })
            .collect())
    }

    async fn start_node(
        &self,
        spec: NodeSpec,
        transport: TransportKind,
    ) -> std::result::Result<NodeHandle, StartupError> {
        let index = spec.index;
        let (graceful_tx, graceful_rx) = watch::channel(());

        debug!(index, rest = %spec.rest_address, rpc = %spec.rpc_address, "launching node");
        let task = self
            .launcher
            .launch(spec.clone(), self.settings.clone(), graceful_rx)
            .await
            .map_err(|source| StartupError::Node { index, source })?;
        let node = NodeHandle::new(spec, graceful_tx, task);

        if let Err(e) = self.wait_until_ready(&node, transport).await {
            node.stop(self.shutdown_timeout).await;
            return Err(e);
        }
        Ok(node)
    }

    async fn wait_until_ready(
        &self,
        node: &NodeHandle,
        transport: TransportKind,
    ) -> std::result::Result<(), StartupError> {
        let index = node.index();
        let probe_timeout = self.ready_poll_interval.max(Duration::from_millis(100));

        let ready = async {
            loop {
                if let Some(reason) = node.take_exit_reason().await {
                    return Err(StartupError::Exited { index, reason });
                }

                let rest_up = TcpStream::connect(node.rest_address()).await.is_ok();
                if rest_up && transport.probe(node.rpc_address(), probe_timeout).await {
                    return Ok(());
                }

                debug!(index, "node not ready, retrying...");
                tokio::time::sleep(self.ready_poll_interval).await;
            }
        };

        match tokio::time::timeout(self.startup_timeout, ready).await {
            Ok(result) => result,
            Err(_) => Err(StartupError::Timeout {
                index,
                address: node.rest_address(),
                waited: self.startup_timeout,
            }),
        }
    }

    async fn rollback(
        &self,
        started: Vec<NodeHandle>,
    ) {
        for node in started.iter().rev() {
            warn!(index = node.index(), "rolling back node");
            node.stop(self.shutdown_timeout).await;
            self.sink.record(HarnessEvent::NodeRolledBack { index: node.index() });
        }
    }
}
