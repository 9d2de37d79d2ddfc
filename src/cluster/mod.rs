//! Cluster provisioning.
//!
//! The provisioner allocates endpoints, hands one [`NodeSpec`] per member to a
//! [`NodeLauncher`], and waits for each node to become ready before starting
//! the next. Startup is all-or-nothing.

mod launcher;
mod node;
mod ports;
mod provisioner;

pub use launcher::*;
pub use node::*;
pub use provisioner::*;
