use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tracing::debug;
use tracing::warn;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use super::LocalNode;
use crate::NodeResult;

pub(super) async fn serve(
    node: Arc<LocalNode>,
    listener: TcpListener,
    mut shutdown: watch::Receiver<()>,
) -> NodeResult {
    let local_addr = listener.local_addr()?;
    let node_id = node.node_id;

    warp::serve(routes(node))
        .serve_incoming_with_graceful_shutdown(TcpListenerStream::new(listener), async move {
            let _ = shutdown.changed().await;
        })
        .await;

    debug!(node_id, %local_addr, "rest service stopped");
    Ok(())
}

pub(super) fn routes(
    node: Arc<LocalNode>
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .and(with_node(node.clone()))
        .map(|node: Arc<LocalNode>| warp::reply::json(&node.status()));

    let get_key = warp::path!("v1" / "keys" / String)
        .and(warp::get())
        .and(with_node(node.clone()))
        .and_then(get_value);

    let put_key = warp::path!("v1" / "keys" / String)
        .and(warp::put())
        .and(warp::body::bytes())
        .and(with_node(node))
        .and_then(put_value);

    health.or(get_key).or(put_key)
}

fn with_node(
    node: Arc<LocalNode>
) -> impl Filter<Extract = (Arc<LocalNode>,), Error = Infallible> + Clone {
    warp::any().map(move || node.clone())
}

async fn get_value(
    key: String,
    node: Arc<LocalNode>,
) -> Result<Response, Rejection> {
    Ok(match node.db.get(key.as_bytes()) {
        Ok(Some(value)) => value.to_vec().into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(node_id = node.node_id, %key, "read failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    })
}

async fn put_value(
    key: String,
    body: Bytes,
    node: Arc<LocalNode>,
) -> Result<Response, Rejection> {
    Ok(match node.db.insert(key.as_bytes(), body.to_vec()) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            warn!(node_id = node.node_id, %key, "write failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    })
}
