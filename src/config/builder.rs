use std::fmt::Write;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::ClusterSettings;
use super::CONSENSUS_ENABLED_KEY;
use super::CONSENSUS_TRANSPORT_KEY;
use super::STORAGE_ROOT_KEY;
use crate::ConfigurationError;
use crate::EventSink;
use crate::HarnessEvent;
use crate::TracingSink;
use crate::TransportKind;

/// Produces isolated [`ClusterSettings`], one storage root per identity.
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    base_dir: PathBuf,
    sink: Arc<dyn EventSink>,
}

impl ConfigurationBuilder {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(
        mut self,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        self.sink = sink;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Builds settings with consensus enabled over `transport` and a freshly
    /// prepared storage root derived from `identity`.
    ///
    /// Anything left at that root by an earlier run is removed first.
    pub fn build(
        &self,
        identity: &str,
        transport: TransportKind,
    ) -> Result<ClusterSettings, ConfigurationError> {
        let root = storage_root_for(&self.base_dir, identity)?;
        prepare_storage_root(&root)?;

        let mut settings = ClusterSettings::new();
        settings.set(STORAGE_ROOT_KEY, root.to_string_lossy());
        init_consensus(&mut settings, transport, self.sink.as_ref());
        Ok(settings)
    }
}

/// Enables consensus and records the transport, emitting one record of the choice.
pub fn init_consensus(
    settings: &mut ClusterSettings,
    transport: TransportKind,
    sink: &dyn EventSink,
) {
    settings.set_bool(CONSENSUS_ENABLED_KEY, true);
    settings.set(CONSENSUS_TRANSPORT_KEY, transport.name());
    sink.record(HarnessEvent::TransportSelected {
        key: CONSENSUS_TRANSPORT_KEY,
        transport,
    });
}

/// Storage root reserved for `identity` under `base_dir`.
pub fn storage_root_for(
    base_dir: &Path,
    identity: &str,
) -> Result<PathBuf, ConfigurationError> {
    if identity.is_empty() {
        return Err(ConfigurationError::EmptyIdentity);
    }
    Ok(base_dir.join(encode_identity(identity)))
}

/// Bytes outside `[A-Za-z0-9-]` are written as `_XX`; `_` only ever starts an
/// escape, so two identities never share an encoding.
fn encode_identity(identity: &str) -> String {
    let mut encoded = String::with_capacity(identity.len());
    for byte in identity.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "_{byte:02X}");
        }
    }
    encoded
}

fn prepare_storage_root(root: &Path) -> Result<(), ConfigurationError> {
    let io_err = |source| ConfigurationError::StorageRoot {
        path: root.to_path_buf(),
        source,
    };

    if root.exists() {
        debug!(root = %root.display(), "removing stale storage root");
        fs::remove_dir_all(root).map_err(io_err)?;
    }
    fs::create_dir_all(root).map_err(io_err)
}
