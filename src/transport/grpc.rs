use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Channel;
use tonic::transport::Server;
use tonic_health::pb::health_check_response::ServingStatus as ProbeStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;
use tonic_health::server::health_reporter;
use tonic_health::ServingStatus;
use tracing::debug;

use crate::NodeResult;

/// Health service name a member reports as serving once its transport is up.
pub(crate) const CONSENSUS_SERVICE: &str = "raft_minicluster.Consensus";

pub(super) async fn serve(
    listener: TcpListener,
    mut shutdown: watch::Receiver<()>,
) -> NodeResult {
    let (mut reporter, health_service) = health_reporter();
    reporter
        .set_service_status(CONSENSUS_SERVICE, ServingStatus::Serving)
        .await;

    let local_addr = listener.local_addr()?;
    debug!(%local_addr, "grpc transport serving");

    Server::builder()
        .add_service(health_service)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            let _ = shutdown.changed().await;
            debug!(%local_addr, "grpc transport received shutdown signal");
        })
        .await?;

    Ok(())
}

pub(super) async fn probe(
    addr: SocketAddr,
    timeout: Duration,
) -> bool {
    let endpoint = match Channel::from_shared(format!("http://{addr}")) {
        Ok(endpoint) => endpoint.connect_timeout(timeout).timeout(timeout),
        Err(e) => {
            debug!(%addr, "invalid grpc probe address: {e}");
            return false;
        }
    };

    let check = async {
        let channel = endpoint.connect().await.ok()?;
        let request = tonic::Request::new(HealthCheckRequest {
            service: CONSENSUS_SERVICE.to_string(),
        });
        let response = HealthClient::new(channel).check(request).await.ok()?.into_inner();
        Some(response.status == ProbeStatus::Serving as i32)
    };

    matches!(tokio::time::timeout(timeout, check).await, Ok(Some(true)))
}
