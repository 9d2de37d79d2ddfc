use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use raft_minicluster::ClusterSettings;
use raft_minicluster::HarnessOptions;
use raft_minicluster::LocalNodeLauncher;
use raft_minicluster::NodeError;
use raft_minicluster::NodeLauncher;
use raft_minicluster::NodeResult;
use raft_minicluster::NodeSpec;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tonic::async_trait;
use tracing_subscriber::EnvFilter;

pub const WAIT_FOR_NODE_READY_IN_SEC: u64 = 6;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for integration test.");
}

/// Harness options rooted under `base_dir`, with test-sized timeouts.
pub fn options_under(base_dir: &Path) -> HarnessOptions {
    let mut options = HarnessOptions::default()
        .with_storage_base_dir(base_dir)
        .with_startup_timeout(Duration::from_secs(WAIT_FOR_NODE_READY_IN_SEC));
    options.ready_poll_interval = Duration::from_millis(20);
    options.shutdown_timeout = Duration::from_secs(2);
    options
}

pub async fn is_port_open(addr: SocketAddr) -> bool {
    TcpStream::connect(addr).await.is_ok()
}

pub async fn wait_for_port_closed(addr: SocketAddr) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if !is_port_open(addr).await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Starts real local nodes except the one at `fail_at`, whose launch fails.
#[derive(Debug)]
pub struct FailingLauncher {
    fail_at: usize,
    launched: Mutex<Vec<NodeSpec>>,
}

impl FailingLauncher {
    pub fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            launched: Mutex::new(Vec::new()),
        }
    }

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
            return Err(NodeError::message(format!("node {} refused to start", spec.index)));
        }
        let task = LocalNodeLauncher.launch(spec.clone(), settings, shutdown).await?;
        self.launched.lock().push(spec);
        Ok(task)
    }
}
