use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tonic::async_trait;

use crate::ClusterSettings;
use crate::LocalNodeLauncher;
use crate::NodeError;
use crate::NodeLauncher;
use crate::NodeResult;
use crate::NodeSpec;

/// Starts real local nodes but refuses to launch the node at `fail_at`.
#[derive(Debug)]
pub struct FailingLauncher {
    fail_at: usize,
    inner: LocalNodeLauncher,
    launched: Mutex<Vec<NodeSpec>>,
}

impl FailingLauncher {
    pub fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            inner: LocalNodeLauncher,
            launched: Mutex::new(Vec::new()),
        }
    }

    /// Specs of the nodes that were actually launched, in launch order.
    pub fn launched(&self) -> Vec<NodeSpec> {
        self.launched.lock().clone()
    }
}

#[async_trait]
impl NodeLauncher for FailingLauncher {
    async fn launch(
        &self,
        spec: NodeSpec,
        settings: Arc<ClusterSettings>,
        shutdown: watch::Receiver<()>,
    ) -> Result<JoinHandle<NodeResult>, NodeError> {
        if spec.index == self.fail_at {
            return Err(NodeError::message(format!("injected failure at node {}", spec.index)));
        }
        let task = self.inner.launch(spec.clone(), settings, shutdown).await?;
        self.launched.lock().push(spec);
        Ok(task)
    }
}
