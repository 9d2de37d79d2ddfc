mod common;

use std::sync::Arc;

use common::enable_logger;
use common::is_port_open;
use common::options_under;
use common::wait_for_port_closed;
use common::FailingLauncher;
use raft_minicluster::ClusterHarness;
use raft_minicluster::Error;
use raft_minicluster::HarnessEvent;
use raft_minicluster::MemorySink;
use raft_minicluster::StartupError;
use raft_minicluster::TransportKind;
use raft_minicluster::CONSENSUS_TRANSPORT_KEY;
use raft_minicluster::DEFAULT_NODE_COUNT;

#[tokio::test]
async fn default_harness_starts_three_consensus_nodes() {
    enable_logger();
    let temp_dir = tempfile::tempdir().unwrap();

    let harness = ClusterHarness::start("SuiteA", options_under(temp_dir.path()))
        .await
        .unwrap();

    assert_eq!(harness.cluster().len(), DEFAULT_NODE_COUNT);
    assert_eq!(harness.cluster().front_door().index(), 0);
    assert!(harness.settings().consensus_enabled());
    assert_eq!(harness.settings().transport().unwrap(), TransportKind::default());
    assert_eq!(harness.settings().get(CONSENSUS_TRANSPORT_KEY), Some("framed_tcp"));
    assert!(harness.storage_root().starts_with(temp_dir.path()));
    assert_eq!(harness.settings().storage_root().unwrap(), harness.storage_root());

    harness.shutdown().await;
}

#[tokio::test]
async fn client_is_bound_to_the_front_door() {
    enable_logger();
    let temp_dir = tempfile::tempdir().unwrap();
    let harness = ClusterHarness::start("SuiteA", options_under(temp_dir.path()))
        .await
        .unwrap();

    let front_door_port = harness.cluster().nodes()[0].rest_port();
    assert_eq!(harness.rest_port(), front_door_port);

    let client = harness.new_client().unwrap();
    assert_eq!(client.base_url(), format!("http://localhost:{front_door_port}"));

    let status = client.health().await.unwrap();
    assert_eq!(status.node_id, 1);
    assert_eq!(status.peers, DEFAULT_NODE_COUNT);

    client.put("user:1001", "Alice").await.unwrap();
    assert_eq!(client.get("user:1001").await.unwrap(), Some(b"Alice".to_vec()));
    assert_eq!(client.get("user:1002").await.unwrap(), None);

    // Each call mints an independent client
    let other = harness.new_client().unwrap();
    assert_eq!(other.get("user:1001").await.unwrap(), Some(b"Alice".to_vec()));

    harness.shutdown().await;
}

#[tokio::test]
async fn shutdown_twice_is_harmless() {
    enable_logger();
    let temp_dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let harness = ClusterHarness::start("SuiteB", options_under(temp_dir.path()).with_sink(sink.clone()))
        .await
        .unwrap();
    let addresses: Vec<_> = harness.cluster().nodes().iter().map(|n| n.rest_address()).collect();

    harness.shutdown().await;
    harness.shutdown().await;

    assert!(!harness.cluster().is_running());
    for addr in addresses {
        assert!(!is_port_open(addr).await);
    }
    let stopped = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, HarnessEvent::ClusterStopped { .. }))
        .count();
    assert_eq!(stopped, 1);
}

#[tokio::test]
async fn failing_third_node_leaves_nothing_running() {
    enable_logger();
    let temp_dir = tempfile::tempdir().unwrap();
    let launcher = Arc::new(FailingLauncher::new(2));

    let result = ClusterHarness::start(
        "SuiteC",
        options_under(temp_dir.path()).with_launcher(launcher.clone()),
    )
    .await;

    assert!(matches!(
        result,
        Err(Error::Startup(StartupError::Node { index: 2, .. }))
    ));

    let launched = launcher.launched();
    assert_eq!(launched.len(), 2);
    for spec in launched {
        assert!(!is_port_open(spec.rest_address).await);
        assert!(!is_port_open(spec.rpc_address).await);
    }
}

#[tokio::test]
async fn identities_never_share_a_storage_root() {
    enable_logger();
    let temp_dir = tempfile::tempdir().unwrap();
    let options = || options_under(temp_dir.path()).with_node_count(1);

    let first = ClusterHarness::start("Suite/A", options()).await.unwrap();
    let second = ClusterHarness::start("Suite_2FA", options()).await.unwrap();

    assert_ne!(first.storage_root(), second.storage_root());
    assert!(first.storage_root().is_dir());
    assert!(second.storage_root().is_dir());
    assert_ne!(first.rest_port(), second.rest_port());

    first.shutdown().await;
    second.shutdown().await;
}

#[tokio::test]
async fn grpc_transport_is_selectable() {
    enable_logger();
    let temp_dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let options = options_under(temp_dir.path())
        .with_transport(TransportKind::Grpc)
        .with_node_count(2)
        .with_sink(sink.clone());

    let harness = ClusterHarness::start("SuiteGrpc", options).await.unwrap();

    assert_eq!(harness.settings().transport().unwrap(), TransportKind::Grpc);
    let status = harness.new_client().unwrap().health().await.unwrap();
    assert_eq!(status.transport, TransportKind::Grpc);

    let selected: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, HarnessEvent::TransportSelected { .. }))
        .collect();
    assert_eq!(
        selected,
        vec![HarnessEvent::TransportSelected {
            key: CONSENSUS_TRANSPORT_KEY,
            transport: TransportKind::Grpc,
        }]
    );

    harness.shutdown().await;
}

#[tokio::test]
async fn dropping_the_harness_stops_the_cluster() {
    enable_logger();
    let temp_dir = tempfile::tempdir().unwrap();
    let harness = ClusterHarness::start("SuiteDrop", options_under(temp_dir.path()).with_node_count(2))
        .await
        .unwrap();
    let addresses: Vec<_> = harness
        .cluster()
        .nodes()
        .iter()
        .flat_map(|n| [n.rest_address(), n.rpc_address()])
        .collect();

    drop(harness);

    for addr in addresses {
        assert!(wait_for_port_closed(addr).await, "{addr} still accepting");
    }
}

#[tokio::test]
async fn storage_cleanup_removes_the_root() {
    enable_logger();
    let temp_dir = tempfile::tempdir().unwrap();
    let options = options_under(temp_dir.path())
        .with_node_count(1)
        .with_cleanup_storage_on_shutdown(true);

    let harness = ClusterHarness::start("SuiteCleanup", options).await.unwrap();
    let root = harness.storage_root().to_path_buf();
    assert!(root.is_dir());

    harness.shutdown().await;
    assert!(!root.exists());
}

#[tokio::test]
async fn empty_identity_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let result = ClusterHarness::start("", options_under(temp_dir.path())).await;
    assert!(matches!(result, Err(Error::Configuration(_))));
}
