//! Peering between two topologies.

use super::ResourceGraph;
use crate::error::TopologyError;
use crate::models::{tags, PeeringLink, Resource, ResourceKind, ResourceRef, Subnet, Topology};
use std::collections::BTreeSet;

/// Overlap test used before peering.
///
/// Only checks whether `ours` contains the first or last address of `theirs`.
/// A smaller `ours` sitting strictly inside `theirs` is not caught.
pub fn blocks_overlap(ours: &Topology, theirs: &Topology) -> bool {
    ours.block.contains(theirs.block.first()) || ours.block.contains(theirs.block.last())
}

/// Sorted, de-duplicated route tables of the given subnets.
fn route_tables(subnets: &[Subnet]) -> Vec<ResourceRef> {
    subnets
        .iter()
        .map(|s| s.route_table.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Peer `ours` with `theirs` and route between them.
///
/// `our_subnets` / `their_subnets` narrow which subnets get routes; `None`
/// means every subnet of that topology. Emits the peering connection, then
/// one route per route table on our side, then on theirs.
pub fn peer_with(
    graph: &mut ResourceGraph,
    ours: &Topology,
    theirs: &Topology,
    our_subnets: Option<&[Subnet]>,
    their_subnets: Option<&[Subnet]>,
) -> Result<PeeringLink, TopologyError> {
    if blocks_overlap(ours, theirs) {
        return Err(TopologyError::OverlappingAddressSpace {
            ours: ours.block,
            theirs: theirs.block,
        });
    }

    let our_route_tables = match our_subnets {
        Some(subnets) => route_tables(subnets),
        None => route_tables(&ours.all_subnets()),
    };
    let their_route_tables = match their_subnets {
        Some(subnets) => route_tables(subnets),
        None => route_tables(&theirs.all_subnets()),
    };

    let their_ident = theirs.ident();
    let mut local = ResourceGraph::new();

    let connection = local.emit(
        Resource::new(
            ResourceKind::AwsVpcPeeringConnection,
            format!("{}-to-{their_ident}", ours.name),
        )
        .attr("auto_accept", true)
        .attr(
            "tags",
            tags(
                &[("Name", format!("{} to {}", ours.name, theirs.name))],
                &ours.tags,
            ),
        )
        .reference("peer_vpc_id", &theirs.id)
        .reference("vpc_id", &ours.id),
    )?;

    for (i, route_table) in our_route_tables.iter().enumerate() {
        local.emit(
            Resource::new(
                ResourceKind::AwsRoute,
                format!("{}-{their_ident}-peer-{i}", ours.name),
            )
            .attr("destination_cidr_block", theirs.block.to_string())
            .reference("route_table_id", route_table)
            .reference("vpc_peering_connection_id", &connection),
        )?;
    }

    for (i, route_table) in their_route_tables.iter().enumerate() {
        local.emit(
            Resource::new(
                ResourceKind::AwsRoute,
                format!("{their_ident}-{}-peer-{i}", ours.name),
            )
            .attr("destination_cidr_block", ours.block.to_string())
            .reference("route_table_id", route_table)
            .reference("vpc_peering_connection_id", &connection),
        )?;
    }

    log::info!(
        "Peered {} {} with {} {}: {} + {} route(s)",
        ours.name,
        ours.block,
        theirs.name,
        theirs.block,
        our_route_tables.len(),
        their_route_tables.len()
    );
    graph.merge(local)?;

    Ok(PeeringLink {
        connection,
        ours: ours.id.clone(),
        theirs: theirs.id.clone(),
        our_block: ours.block,
        their_block: theirs.block,
        our_route_tables,
        their_route_tables,
    })
}
