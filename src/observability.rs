//! Harness lifecycle records.
//!
//! The harness never writes to a process-wide logger directly; every record
//! goes through an [`EventSink`] handed in at construction. [`TracingSink`]
//! forwards records to `tracing`, [`MemorySink`] keeps them for assertions.

use std::fmt::Debug;
use std::net::SocketAddr;

use parking_lot::Mutex;
use tracing::info;
use tracing::warn;

use crate::TransportKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessEvent {
    /// Emitted once per configuration build
    TransportSelected {
        key: &'static str,
        transport: TransportKind,
    },
    NodeStarted {
        index: usize,
        rest_address: SocketAddr,
    },
    /// A started node was stopped because a later node failed
    NodeRolledBack { index: usize },
    ClusterStopped { nodes: usize },
}

pub trait EventSink: Send + Sync + Debug {
    fn record(
        &self,
        event: HarnessEvent,
    );
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(
        &self,
        event: HarnessEvent,
    ) {
        match event {
            HarnessEvent::TransportSelected { key, transport } => info!("{key} = {transport}"),
            HarnessEvent::NodeStarted { index, rest_address } => {
                info!(index, %rest_address, "node started")
            }
            HarnessEvent::NodeRolledBack { index } => warn!(index, "node rolled back"),
            HarnessEvent::ClusterStopped { nodes } => info!(nodes, "cluster stopped"),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<HarnessEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().clone()
    }
}

impl EventSink for MemorySink {
    fn record(
        &self,
        event: HarnessEvent,
    ) {
        self.events.lock().push(event);
    }
}
