//! Consensus transport selection.
//!
//! [`TransportKind`] is the closed set of RPC mechanisms cluster members can
//! use to talk to each other. Every kind knows how to serve its endpoint on a
//! pre-bound listener and how to probe a peer for readiness, which is all the
//! provisioner needs from it.

mod framed;
mod grpc;


use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::ConfigurationError;
use crate::NodeResult;

/// Supported RPC transports between cluster members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// HTTP/2 gRPC channel, readiness reported through the standard health service
    Grpc,

    /// Length-delimited frames over a raw TCP stream
    #[default]
    FramedTcp,
}

impl TransportKind {
    pub const ALL: [TransportKind; 2] = [TransportKind::Grpc, TransportKind::FramedTcp];

    /// Name stored under [`CONSENSUS_TRANSPORT_KEY`](crate::CONSENSUS_TRANSPORT_KEY).
    pub fn name(&self) -> &'static str {
        match self {
            TransportKind::Grpc => "grpc",
            TransportKind::FramedTcp => "framed_tcp",
        }
    }

    /// Serve this transport on `listener` until `shutdown` fires.
    pub(crate) async fn serve(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<()>,
    ) -> NodeResult {
        match self {
            TransportKind::Grpc => grpc::serve(listener, shutdown).await,
            TransportKind::FramedTcp => framed::serve(listener, shutdown).await,
        }
    }

    /// Returns true once the peer at `addr` answers on this transport.
    pub(crate) async fn probe(
        self,
        addr: SocketAddr,
        timeout: Duration,
    ) -> bool {
        match self {
            TransportKind::Grpc => grpc::probe(addr, timeout).await,
            TransportKind::FramedTcp => framed::probe(addr, timeout).await,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransportKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        TransportKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| ConfigurationError::UnknownTransport(s.to_string()))
    }
}
