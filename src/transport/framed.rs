use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use futures::SinkExt;
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Framed;
use tokio_util::codec::LengthDelimitedCodec;
use tracing::debug;
use tracing::warn;

use crate::NodeResult;

pub(super) const PING: &[u8] = b"ping";
pub(super) const PONG: &[u8] = b"pong";

pub(super) async fn serve(
    listener: TcpListener,
    mut shutdown: watch::Receiver<()>,
) -> NodeResult {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("framed transport received shutdown signal");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(handle_connection(stream, peer, shutdown.clone()));
                }
                Err(e) => warn!("framed transport accept failed: {e}"),
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    mut shutdown: watch::Receiver<()>,
) {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            frame = framed.next() => match frame {
                Some(Ok(frame)) if frame.as_ref() == PING => {
                    if let Err(e) = framed.send(Bytes::from_static(PONG)).await {
                        debug!(%peer, "failed to answer ping: {e}");
                        break;
                    }
                }
                Some(Ok(frame)) => debug!(%peer, len = frame.len(), "ignoring unexpected frame"),
                Some(Err(e)) => {
                    debug!(%peer, "framed connection error: {e}");
                    break;
                }
                None => break,
            }
        }
    }
}

pub(super) async fn probe(
    addr: SocketAddr,
    timeout: Duration,
) -> bool {
    let exchange = async {
        let stream = TcpStream::connect(addr).await.ok()?;
        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
        framed.send(Bytes::from_static(PING)).await.ok()?;
        let reply = framed.next().await?.ok()?;
        Some(reply.as_ref() == PONG)
    };

    matches!(tokio::time::timeout(timeout, exchange).await, Ok(Some(true)))
}
