use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use super::NodeSpec;
use crate::NodeResult;

/// Read-only view of one started cluster member.
#[derive(Debug)]
pub struct NodeHandle {
    spec: NodeSpec,
    graceful_tx: watch::Sender<()>,
    task: Mutex<Option<JoinHandle<NodeResult>>>,
}

impl NodeHandle {
    pub(crate) fn new(
        spec: NodeSpec,
        graceful_tx: watch::Sender<()>,
        task: JoinHandle<NodeResult>,
    ) -> Self {
        Self {
            spec,
            graceful_tx,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn index(&self) -> usize {
        self.spec.index
    }

    pub fn node_id(&self) -> u32 {
        self.spec.node_id
    }

    /// Client-facing service endpoint.
    pub fn rest_address(&self) -> SocketAddr {
        self.spec.rest_address
    }

    pub fn rest_port(&self) -> u16 {
        self.spec.rest_address.port()
    }

    /// Consensus transport endpoint.
    pub fn rpc_address(&self) -> SocketAddr {
        self.spec.rpc_address
    }

    pub fn storage_dir(&self) -> &Path {
        &self.spec.storage_dir
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    /// True until the node task finishes or is stopped.
    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|task| !task.is_finished())
    }

    /// If the node task already finished, consumes it and returns why.
    pub(crate) async fn take_exit_reason(&self) -> Option<String> {
        let task = {
            let mut guard = self.task.lock();
            match guard.as_ref() {
                Some(task) if task.is_finished() => guard.take(),
                _ => None,
            }
        }?;

        Some(match task.await {
            Ok(Ok(())) => "node task returned".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        })
    }

    /// Signals shutdown and waits up to `grace` for the task before aborting it.
    /// Never fails; a second call is a no-op.
    pub(crate) async fn stop(
        &self,
        grace: Duration,
    ) {
        // The receiver is gone once the node exited on its own
        let _ = self.graceful_tx.send(());

        let Some(mut task) = self.task.lock().take() else {
            return;
        };

        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(Ok(()))) => debug!(node_id = self.spec.node_id, "node stopped"),
            Ok(Ok(Err(e))) => warn!(node_id = self.spec.node_id, "node stopped with error: {e}"),
            Ok(Err(e)) => warn!(node_id = self.spec.node_id, "node task failed: {e}"),
            Err(_) => {
                warn!(node_id = self.spec.node_id, ?grace, "node did not stop in time, aborting");
                task.abort();
                let _ = task.await;
            }
        }
    }

    /// Synchronous stop for drop paths: signal, then abort without waiting.
    pub(crate) fn halt(&self) {
        let _ = self.graceful_tx.send(());
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}
