//! Built topologies, DNS zones and peering links.

use super::{AddressBlock, ResourceRef, Subnet};
use crate::error::TopologyError;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A hosted DNS zone, either found in the provider or created in this run.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DnsZone {
    pub fqdn: String,
    pub id: ResourceRef,
}

/// NAT gateway seated in one zone's `nat_gateway` subnet.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NatGateway {
    pub zone: String,
    pub id: ResourceRef,
    pub eip: ResourceRef,
    pub subnet: ResourceRef,
}

/// A virtual network with its subnets, gateways and security rules.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub name: String,
    pub id: ResourceRef,
    pub block: AddressBlock,
    pub zone: DnsZone,
    pub azs: Vec<String>,
    /// Group name to one subnet per zone, in zone order.
    pub subnets: IndexMap<String, Vec<Subnet>>,
    pub internet_gateway: Option<ResourceRef>,
    pub nat_gateways: Option<Vec<NatGateway>>,
    pub internal_ssh_security_group: ResourceRef,
    pub ssh_group: String,
    pub tags: BTreeMap<String, String>,
}

impl Topology {
    /// Every subnet across all groups, group order first, then zone order.
    pub fn all_subnets(&self) -> Vec<Subnet> {
        self.subnets.values().flatten().cloned().collect()
    }

    /// Subnets of the named groups, in the order the groups are named.
    ///
    /// Every name must be a group of this topology.
    pub fn subnets_in(&self, groups: &[String]) -> Result<Vec<Subnet>, TopologyError> {
        let mut subnets = Vec::new();
        for group in groups {
            let members = self.subnets.get(group).ok_or_else(|| {
                TopologyError::Configuration(format!(
                    "network {} has no subnet group '{group}'",
                    self.name
                ))
            })?;
            subnets.extend(members.iter().cloned());
        }
        Ok(subnets)
    }

    /// Name with whitespace and dots turned into dashes, for resource names.
    pub fn ident(&self) -> String {
        crate::processing::ident(&self.name)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count: usize = self.subnets.values().map(Vec::len).sum();
        write!(
            f,
            "{} [{}] ({} groups, {} subnets, {})",
            self.name,
            self.block,
            self.subnets.len(),
            count,
            self.zone.fqdn
        )
    }
}

/// Routing relationship between two networks through a peering connection.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PeeringLink {
    pub connection: ResourceRef,
    pub ours: ResourceRef,
    pub theirs: ResourceRef,
    pub our_block: AddressBlock,
    pub their_block: AddressBlock,
    /// Sorted, de-duplicated; each gets a route to `their_block`.
    pub our_route_tables: Vec<ResourceRef>,
    /// Sorted, de-duplicated; each gets a route to `our_block`.
    pub their_route_tables: Vec<ResourceRef>,
}
