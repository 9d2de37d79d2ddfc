use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::ConfigurationError;
use crate::TransportKind;

/// Whether storage containers replicate through the consensus protocol.
pub const CONSENSUS_ENABLED_KEY: &str = "storage.container.consensus.enabled";

/// Name of the [`TransportKind`] consensus traffic travels over.
pub const CONSENSUS_TRANSPORT_KEY: &str = "storage.container.consensus.rpc.type";

/// Isolated on-disk location for every node of one cluster.
pub const STORAGE_ROOT_KEY: &str = "storage.local.root";

/// Keyed settings shared by every member of a cluster.
///
/// Values are stored as strings and interpreted on lookup, so collaborators
/// may define their own keys next to the ones above.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSettings {
    values: BTreeMap<String, String>,
}

impl ClusterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.values.insert(key.into(), value.into());
    }

    pub fn set_bool(
        &mut self,
        key: impl Into<String>,
        value: bool,
    ) {
        self.set(key, value.to_string());
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns `None` when the key is absent or not a boolean.
    pub fn get_bool(
        &self,
        key: &str,
    ) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn consensus_enabled(&self) -> bool {
        self.get_bool(CONSENSUS_ENABLED_KEY).unwrap_or(false)
    }

    pub fn transport(&self) -> Result<TransportKind, ConfigurationError> {
        self.get(CONSENSUS_TRANSPORT_KEY)
            .ok_or(ConfigurationError::MissingSetting(CONSENSUS_TRANSPORT_KEY))?
            .parse()
    }

    pub fn storage_root(&self) -> Result<PathBuf, ConfigurationError> {
        match self.get(STORAGE_ROOT_KEY) {
            Some(root) if !root.is_empty() => Ok(PathBuf::from(root)),
            Some(root) => Err(ConfigurationError::InvalidSetting {
                key: STORAGE_ROOT_KEY,
                value: root.to_string(),
            }),
            None => Err(ConfigurationError::MissingSetting(STORAGE_ROOT_KEY)),
        }
    }

    /// Checks that consensus settings are paired with a valid transport and a
    /// storage root is recorded. Returns the selected transport.
    pub fn validate(&self) -> Result<TransportKind, ConfigurationError> {
        match self.get(CONSENSUS_ENABLED_KEY) {
            None => return Err(ConfigurationError::MissingSetting(CONSENSUS_ENABLED_KEY)),
            Some(value) => match value.trim().parse::<bool>() {
                Ok(true) => {}
                Ok(false) => return Err(ConfigurationError::ConsensusDisabled),
                Err(_) => {
                    return Err(ConfigurationError::InvalidSetting {
                        key: CONSENSUS_ENABLED_KEY,
                        value: value.to_string(),
                    })
                }
            },
        }

        let transport = self.transport()?;
        self.storage_root()?;
        Ok(transport)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
