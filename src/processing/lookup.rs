//! Rebuilding a topology for a network that already exists in the provider.

use super::DEFAULT_SSH_GROUP;
use crate::error::TopologyError;
use crate::models::{DnsZone, ResourceKind, ResourceRef, Subnet, Topology, GROUP_TAG};
use crate::provider::{NetworkSnapshot, ProviderQuery, SubnetSnapshot};
use indexmap::IndexMap;
use itertools::Itertools;

fn group_of(subnet: &SubnetSnapshot) -> String {
    match subnet.tags.get(GROUP_TAG) {
        Some(group) => group.clone(),
        None if subnet.public => "public".to_string(),
        None => "private".to_string(),
    }
}

/// Look up `name` and describe it as a read-only [`Topology`].
///
/// Only references to existing resources are produced; nothing is allocated
/// and nothing is emitted.
///
/// # Returns
/// * `Ok(Topology)` - The network as found
/// * `Err(NotFound)` - If the network, its zone or its SSH security group is missing
pub fn find_topology(provider: &dyn ProviderQuery, name: &str) -> Result<Topology, TopologyError> {
    log::info!("#Start find_topology({name})");
    let network = provider.find_network(name)?;
    topology_from_snapshot(network)
}

fn topology_from_snapshot(network: NetworkSnapshot) -> Result<Topology, TopologyError> {
    let zone = network
        .zone
        .as_ref()
        .map(DnsZone::from)
        .ok_or_else(|| TopologyError::not_found("zone", network.name.clone()))?;
    let ssh_sg = network.ssh_security_group.clone().ok_or_else(|| {
        TopologyError::not_found(
            "security group",
            format!("{}-internal-ssh", super::ident(&network.name)),
        )
    })?;

    let mut subnets: IndexMap<String, Vec<Subnet>> = IndexMap::new();
    // descending subnet id
    for s in network.subnets.iter().sorted_by(|a, b| b.id.cmp(&a.id)) {
        let group = group_of(s);
        subnets.entry(group.clone()).or_default().push(Subnet {
            id: ResourceRef::existing(ResourceKind::AwsSubnet, s.id.clone()),
            group,
            zone: s.zone.clone(),
            block: s.cidr,
            public: s.public,
            route_table: ResourceRef::existing(ResourceKind::AwsRouteTable, s.route_table.clone()),
            gateway: None,
        });
    }
    let azs: Vec<String> = network
        .subnets
        .iter()
        .map(|s| s.zone.clone())
        .unique()
        .sorted()
        .collect();

    log::debug!(
        "Found {} with {} subnet(s) in {} group(s)",
        network.name,
        network.subnets.len(),
        subnets.len()
    );

    Ok(Topology {
        id: ResourceRef::existing(ResourceKind::AwsVpc, network.id),
        block: network.cidr,
        zone,
        azs,
        subnets,
        internet_gateway: None,
        nat_gateways: None,
        internal_ssh_security_group: ResourceRef::existing(ResourceKind::AwsSecurityGroup, ssh_sg),
        ssh_group: network
            .tags
            .get("ssh_group")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SSH_GROUP.to_string()),
        tags: network.tags,
        name: network.name,
    })
}
