//! Read-only provider lookups.
//!
//! The topology core never talks to the provider itself. Lookups happen
//! before a build through a [`ProviderQuery`] handle:
//! - [`SnapshotProvider`] - answers from a JSON snapshot file
//! - [`AwsCliProvider`] - answers by running the `aws` command line
//! - [`cli`] - command execution shared by the live provider

mod aws;
pub mod cli;
mod snapshot;

use crate::error::TopologyError;
use crate::models::{AddressBlock, DnsZone, ResourceKind, ResourceRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use aws::AwsCliProvider;
pub use snapshot::SnapshotProvider;

/// Handle to whatever answers provider questions for a generation run.
pub trait ProviderQuery {
    /// Availability zones of the current region, in provider order.
    fn availability_zones(&self) -> Result<Vec<String>, TopologyError>;

    /// Hosted zone with the given name; a trailing dot is ignored.
    fn find_zone(&self, fqdn: &str) -> Result<DnsZone, TopologyError>;

    /// Existing network by its `Name` tag.
    fn find_network(&self, name: &str) -> Result<NetworkSnapshot, TopologyError>;
}

/// A hosted zone as the provider reports it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ZoneSnapshot {
    pub fqdn: String,
    pub id: String,
}

impl From<&ZoneSnapshot> for DnsZone {
    fn from(zone: &ZoneSnapshot) -> Self {
        DnsZone {
            fqdn: zone.fqdn.trim_end_matches('.').to_string(),
            id: ResourceRef::existing(ResourceKind::AwsRoute53Zone, zone.id.clone()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SubnetSnapshot {
    pub id: String,
    pub zone: String,
    pub cidr: AddressBlock,
    pub public: bool,
    pub route_table: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Everything needed to rebuild an existing network as a [`crate::models::Topology`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NetworkSnapshot {
    pub name: String,
    pub id: String,
    pub cidr: AddressBlock,
    #[serde(default)]
    pub zone: Option<ZoneSnapshot>,
    #[serde(default)]
    pub subnets: Vec<SubnetSnapshot>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub ssh_security_group: Option<String>,
}

/// Provider state written to / read from a snapshot file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProviderSnapshot {
    #[serde(default)]
    pub availability_zones: Vec<String>,
    #[serde(default)]
    pub zones: Vec<ZoneSnapshot>,
    #[serde(default)]
    pub networks: Vec<NetworkSnapshot>,
}

/// Compare zone names ignoring the trailing root dot.
pub(crate) fn same_fqdn(a: &str, b: &str) -> bool {
    a.trim_end_matches('.') == b.trim_end_matches('.')
}
