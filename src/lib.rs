//! # raft-minicluster
//!
//! Bootstraps small in-process storage clusters for integration tests.
//!
//! A test hands an identity to [`ClusterHarness::start`]; the harness derives
//! an isolated storage root for it, enables consensus over the chosen
//! [`TransportKind`], starts every node and waits until each one answers.
//! Clients minted by the harness talk to the front-door node over REST.
//!
//! ```ignore
//! let harness = ClusterHarness::with_defaults("SuiteA").await?;
//! assert_eq!(harness.cluster().len(), 3);
//!
//! let client = harness.new_client()?;
//! client.put("user:1001", "Alice").await?;
//!
//! harness.shutdown().await;
//! ```

mod client;
mod cluster;
mod config;
mod errors;
mod harness;
mod node;
mod observability;
mod transport;

pub use client::*;
pub use cluster::*;
pub use config::*;
pub use errors::*;
pub use harness::*;
pub use node::*;
pub use observability::*;
pub use transport::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
