//! Generator configuration file.
//!
//! Lists the networks to build, the existing networks to look up and the
//! peerings between them. Unknown keys are rejected at every level.

use crate::error::TopologyError;
use crate::models::{AddressBlock, ResourceKind, ResourceRef};
use crate::processing::{
    SubnetGroups, TopologyOptions, DEFAULT_SSH_GROUP, DEFAULT_SUBNET_BIT_SIZE, DEFAULT_ZONE,
};
use crate::provider::ProviderQuery;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

fn default_subnet_bit_size() -> u8 {
    DEFAULT_SUBNET_BIT_SIZE
}

fn default_true() -> bool {
    true
}

fn default_ssh_group() -> String {
    DEFAULT_SSH_GROUP.to_string()
}

/// One network to build.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub name: String,
    pub cidr: AddressBlock,
    #[serde(default = "default_subnet_bit_size")]
    pub subnet_bit_size: u8,
    #[serde(default = "default_true")]
    pub internet_access: bool,
    /// Allocation ids of pre-created elastic IPs, one per zone.
    #[serde(default)]
    pub nat_eips: Vec<String>,
    /// Discovered from the provider when absent.
    #[serde(default)]
    pub azs: Option<Vec<String>>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default = "default_ssh_group")]
    pub ssh_group: String,
    #[serde(default)]
    pub parent_zone: Option<String>,
    /// Default groups when absent.
    #[serde(default)]
    pub subnets: Option<SubnetGroups>,
}

impl NetworkConfig {
    /// Fill in zones and the parent DNS zone from the provider.
    ///
    /// # Returns
    /// * `Ok((azs, options))` - Zones to build in and the build settings
    /// * `Err` - If a provider lookup fails
    pub fn resolve(
        &self,
        provider: &dyn ProviderQuery,
    ) -> Result<(Vec<String>, TopologyOptions), TopologyError> {
        let azs = match &self.azs {
            Some(azs) => azs.clone(),
            None => {
                let azs = provider.availability_zones()?;
                log::warn!(
                    "No azs configured for {}, using discovered zones: {}",
                    self.name,
                    azs.join(", ")
                );
                azs
            }
        };

        let parent_fqdn = match &self.parent_zone {
            Some(fqdn) => fqdn.as_str(),
            None => {
                log::warn!(
                    "No parent_zone configured for {}, falling back to {DEFAULT_ZONE}",
                    self.name
                );
                DEFAULT_ZONE
            }
        };
        let parent_zone = provider.find_zone(parent_fqdn)?;

        let options = TopologyOptions {
            subnet_bit_size: self.subnet_bit_size,
            internet_access: self.internet_access,
            nat_eips: self
                .nat_eips
                .iter()
                .map(|id| ResourceRef::existing(ResourceKind::AwsEip, id.clone()))
                .collect(),
            tags: self.tags.clone(),
            ssh_group: self.ssh_group.clone(),
            parent_zone,
        };
        Ok((azs, options))
    }
}

/// Peering between two networks known to this run, by name.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PeeringConfig {
    pub from: String,
    pub to: String,
    /// Subnet groups of `from` that get routes; all when absent.
    #[serde(default)]
    pub our_groups: Option<Vec<String>>,
    #[serde(default)]
    pub their_groups: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
    #[serde(default)]
    pub existing_networks: Vec<String>,
    #[serde(default)]
    pub peerings: Vec<PeeringConfig>,
}

impl GeneratorConfig {
    /// Read a config JSON file.
    pub fn load(path: &str) -> Result<Self, TopologyError> {
        if !Path::new(path).exists() {
            return Err(TopologyError::Config(format!(
                "Config file does not exist: {path}"
            )));
        }
        log::info!("Reading config: {path}");
        let json = std::fs::read_to_string(path)
            .map_err(|e| TopologyError::Config(format!("Error reading config {path}: {e}")))?;
        Self::from_json(&json)
    }

    /// Parse config JSON, reporting the path of the offending key on error.
    pub fn from_json(json: &str) -> Result<Self, TopologyError> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
            TopologyError::Config(format!("path={} error={}", e.path(), e))
        })
    }
}
