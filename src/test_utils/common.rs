use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

use crate::ClusterSettings;
use crate::ConfigurationBuilder;
use crate::MemorySink;
use crate::TransportKind;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Consensus-enabled settings rooted under `base_dir`.
pub fn test_settings(
    base_dir: &Path,
    identity: &str,
    transport: TransportKind,
) -> Arc<ClusterSettings> {
    let settings = ConfigurationBuilder::new(base_dir)
        .with_sink(Arc::new(MemorySink::new()))
        .build(identity, transport)
        .expect("settings should build");
    Arc::new(settings)
}

pub async fn is_port_open(addr: SocketAddr) -> bool {
    TcpStream::connect(addr).await.is_ok()
}

/// Polls until nothing accepts on `addr`, giving up after `max_wait`.
pub async fn wait_for_port_closed(
    addr: SocketAddr,
    max_wait: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + max_wait;
    while tokio::time::Instant::now() < deadline {
        if !is_port_open(addr).await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
