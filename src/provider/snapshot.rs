//! Provider answers from a snapshot file.
//!
//! Lets a run be repeated without provider access, and is what the tests use.

use super::{same_fqdn, NetworkSnapshot, ProviderQuery, ProviderSnapshot};
use crate::error::TopologyError;
use crate::models::DnsZone;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct SnapshotProvider {
    snapshot: ProviderSnapshot,
}

impl SnapshotProvider {
    pub fn new(snapshot: ProviderSnapshot) -> Self {
        SnapshotProvider { snapshot }
    }

    /// Read a snapshot JSON file.
    ///
    /// # Returns
    /// * `Ok(SnapshotProvider)` - The parsed snapshot
    /// * `Err` - If the file is missing or is not a valid snapshot
    pub fn from_file(path: &str) -> Result<Self, TopologyError> {
        if !Path::new(path).exists() {
            return Err(TopologyError::Config(format!(
                "Snapshot file does not exist: {path}"
            )));
        }
        log::info!("Reading provider snapshot: {path}");
        let json = std::fs::read_to_string(path)
            .map_err(|e| TopologyError::Config(format!("Error reading snapshot {path}: {e}")))?;

        let mut deserializer = serde_json::Deserializer::from_str(&json);
        let snapshot: ProviderSnapshot = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|e| {
                TopologyError::Config(format!(
                    "Error parsing snapshot {path}: path={} error={}",
                    e.path(),
                    e
                ))
            })?;
        log::debug!(
            "Snapshot has {} zone(s), {} network(s)",
            snapshot.zones.len(),
            snapshot.networks.len()
        );
        Ok(SnapshotProvider { snapshot })
    }

    pub fn snapshot(&self) -> &ProviderSnapshot {
        &self.snapshot
    }
}

impl ProviderQuery for SnapshotProvider {
    fn availability_zones(&self) -> Result<Vec<String>, TopologyError> {
        if self.snapshot.availability_zones.is_empty() {
            return Err(TopologyError::not_found("availability zones", "snapshot"));
        }
        Ok(self.snapshot.availability_zones.clone())
    }

    fn find_zone(&self, fqdn: &str) -> Result<DnsZone, TopologyError> {
        self.snapshot
            .zones
            .iter()
            .find(|z| same_fqdn(&z.fqdn, fqdn))
            .map(DnsZone::from)
            .ok_or_else(|| TopologyError::not_found("zone", fqdn))
    }

    fn find_network(&self, name: &str) -> Result<NetworkSnapshot, TopologyError> {
        self.snapshot
            .networks
            .iter()
            .find(|n| n.name == name)
            .cloned()
            .ok_or_else(|| TopologyError::not_found("network", name))
    }
}
