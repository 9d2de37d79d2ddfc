//! Scoped owner of one test cluster.
//!
//! A [`ClusterHarness`] is either fully running or does not exist: `start`
//! builds an isolated configuration, provisions every node and only then
//! hands the harness back. The cluster is stopped by [`ClusterHarness::shutdown`]
//! or, on any other exit path, when the harness is dropped.
//!
//! ```ignore
//! let harness = ClusterHarness::start("SuiteA", HarnessOptions::default()).await?;
//! let client = harness.new_client()?;
//! client.put("k", "v").await?;
//! harness.shutdown().await;
//! ```

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::Cluster;
use crate::ClusterSettings;
use crate::ConfigurationBuilder;
use crate::EventSink;
use crate::HarnessConfig;
use crate::LocalNodeLauncher;
use crate::NodeLauncher;
use crate::RestClient;
use crate::Result;
use crate::TracingSink;
use crate::TransportKind;

/// Knobs for [`ClusterHarness::start`].
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub transport: TransportKind,
    pub node_count: usize,
    pub storage_base_dir: PathBuf,
    pub startup_timeout: Duration,
    pub ready_poll_interval: Duration,
    pub shutdown_timeout: Duration,
    pub cleanup_storage_on_shutdown: bool,
    pub launcher: Arc<dyn NodeLauncher>,
    pub sink: Arc<dyn EventSink>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

impl HarnessOptions {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            transport: config.transport,
            node_count: config.node_count,
            storage_base_dir: config.storage_base_dir.clone(),
            startup_timeout: config.startup_timeout(),
            ready_poll_interval: config.ready_poll_interval(),
            shutdown_timeout: config.shutdown_timeout(),
            cleanup_storage_on_shutdown: config.cleanup_storage_on_shutdown,
            launcher: Arc::new(LocalNodeLauncher),
            sink: Arc::new(TracingSink),
        }
    }

    /// Options from the layered [`HarnessConfig`] sources, validated.
    pub fn load() -> Result<Self> {
        let config = HarnessConfig::new()?.validate()?;
        Ok(Self::from_config(&config))
    }

    pub fn with_transport(
        mut self,
        transport: TransportKind,
    ) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_node_count(
        mut self,
        node_count: usize,
    ) -> Self {
        self.node_count = node_count;
        self
    }

    pub fn with_storage_base_dir(
        mut self,
        dir: impl Into<PathBuf>,
    ) -> Self {
        self.storage_base_dir = dir.into();
        self
    }

    pub fn with_startup_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn with_cleanup_storage_on_shutdown(
        mut self,
        cleanup: bool,
    ) -> Self {
        self.cleanup_storage_on_shutdown = cleanup;
        self
    }

    pub fn with_launcher(
        mut self,
        launcher: Arc<dyn NodeLauncher>,
    ) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_sink(
        mut self,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        self.sink = sink;
        self
    }
}

#[derive(Debug)]
pub struct ClusterHarness {
    settings: Arc<ClusterSettings>,
    cluster: Cluster,
    storage_root: PathBuf,
    cleanup_storage: bool,
}

impl ClusterHarness {
    /// Builds settings isolated under `identity` and starts the cluster.
    ///
    /// Returns only once every node is ready; on error nothing is left running.
    pub async fn start(
        identity: &str,
        options: HarnessOptions,
    ) -> Result<Self> {
        let settings = ConfigurationBuilder::new(&options.storage_base_dir)
            .with_sink(options.sink.clone())
            .build(identity, options.transport)?;
        let storage_root = settings.storage_root()?;
        let settings = Arc::new(settings);

        let built = Cluster::builder(settings.clone(), options.launcher)
            .node_count(options.node_count)
            .startup_timeout(options.startup_timeout)
            .ready_poll_interval(options.ready_poll_interval)
            .shutdown_timeout(options.shutdown_timeout)
            .sink(options.sink)
            .build()
            .await;

        let cluster = match built {
            Ok(cluster) => cluster,
            Err(e) => {
                if options.cleanup_storage_on_shutdown {
                    remove_storage_root(&storage_root);
                }
                return Err(e);
            }
        };

        info!(identity, root = %storage_root.display(), nodes = cluster.len(), "harness started");
        Ok(Self {
            settings,
            cluster,
            storage_root,
            cleanup_storage: options.cleanup_storage_on_shutdown,
        })
    }

    pub async fn with_defaults(identity: &str) -> Result<Self> {
        Self::start(identity, HarnessOptions::default()).await
    }

    /// Settings shared by every node; read-only once the cluster exists.
    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// REST port of the front-door node.
    pub fn rest_port(&self) -> u16 {
        self.cluster.front_door().rest_port()
    }

    /// A fresh client bound to the front-door node. The caller owns it.
    pub fn new_client(&self) -> Result<RestClient> {
        let endpoint = format!("http://localhost:{}", self.rest_port());
        Ok(RestClient::connect(&endpoint)?)
    }

    /// Stops the cluster. Idempotent and never fails.
    pub async fn shutdown(&self) {
        if !self.cluster.is_running() {
            return;
        }
        self.cluster.shutdown().await;
        if self.cleanup_storage {
            remove_storage_root(&self.storage_root);
        }
    }
}

impl Drop for ClusterHarness {
    fn drop(&mut self) {
        if !self.cluster.is_running() {
            return;
        }
        self.cluster.halt();
        if self.cleanup_storage {
            remove_storage_root(&self.storage_root);
        }
    }
}

fn remove_storage_root(root: &Path) {
    match fs::remove_dir_all(root) {
        Ok(()) => debug!(root = %root.display(), "storage root removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(root = %root.display(), "failed to remove storage root: {e}"),
    }
}
