//! HTTP client bound to one cluster node.
//!
//! [`RestClient::connect`] only validates the endpoint and prepares the HTTP
//! stack; nothing touches the network until a request is made.
//!
//! # Basic Usage
//! ```no_run
//! use raft_minicluster::RestClient;
//!
//! # async fn demo() -> Result<(), raft_minicluster::ClientError> {
//! let client = RestClient::connect("http://localhost:9081")?;
//! client.put("user:1001", "Alice").await?;
//! assert_eq!(client.get("user:1001").await?, Some(b"Alice".to_vec()));
//! # Ok(())
//! # }
//! ```

mod client_config;
mod rest_client;

pub use client_config::*;
pub use rest_client::*;
