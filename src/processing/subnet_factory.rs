//! Turns one allocated block into a subnet with its route table.

use super::ResourceGraph;
use crate::error::TopologyError;
use crate::models::{
    tags, AddressBlock, Egress, Gateway, NatGateway, Resource, ResourceKind, ResourceRef, Subnet,
    GROUP_TAG,
};
use std::collections::BTreeMap;

/// What a subnet can attach to inside its network.
#[derive(Debug, Clone, Copy)]
pub struct SubnetContext<'a> {
    pub vpc_name: &'a str,
    pub vpc_id: &'a ResourceRef,
    pub internet_gateway: Option<&'a ResourceRef>,
    pub nat_gateways: Option<&'a [NatGateway]>,
    pub tags: &'a BTreeMap<String, String>,
}

impl SubnetContext<'_> {
    /// Gateway for the default route, or `None` for an isolated subnet.
    fn gateway_for(
        &self,
        group: &str,
        zone: &str,
        egress: Egress,
    ) -> Result<Option<Gateway>, TopologyError> {
        if egress.public {
            let igw = self.internet_gateway.ok_or_else(|| {
                TopologyError::Configuration(format!(
                    "public subnet group '{group}' needs an internet gateway but {} has none",
                    self.vpc_name
                ))
            })?;
            return Ok(Some(Gateway::Internet(igw.clone())));
        }
        if !egress.internet {
            return Ok(None);
        }
        let nat = self
            .nat_gateways
            .and_then(|nats| nats.iter().find(|n| n.zone == zone))
            .ok_or_else(|| {
                TopologyError::Configuration(format!(
                    "subnet group '{group}' wants internet egress but {} has no nat gateway in {zone}",
                    self.vpc_name
                ))
            })?;
        Ok(Some(Gateway::Nat(nat.id.clone())))
    }
}

/// Emit subnet, route table, association and default route for one zone.
pub fn build_subnet(
    graph: &mut ResourceGraph,
    ctx: &SubnetContext<'_>,
    group: &str,
    zone: &str,
    block: AddressBlock,
    egress: Egress,
) -> Result<Subnet, TopologyError> {
    let gateway = ctx.gateway_for(group, zone, egress)?;
    let name = format!("{}-{}-{}", ctx.vpc_name, group, zone);

    let id = graph.emit(
        Resource::new(ResourceKind::AwsSubnet, &name)
            .attr("cidr_block", block.to_string())
            .attr("availability_zone", zone)
            .attr("map_public_ip_on_launch", egress.public)
            .attr(
                "tags",
                tags(
                    &[("Name", name.clone()), (GROUP_TAG, group.to_string())],
                    ctx.tags,
                ),
            )
            .reference("vpc_id", ctx.vpc_id),
    )?;

    let route_table = graph.emit(
        Resource::new(ResourceKind::AwsRouteTable, &name)
            .attr("tags", tags(&[("Name", name.clone())], ctx.tags))
            .reference("vpc_id", ctx.vpc_id),
    )?;

    graph.emit(
        Resource::new(ResourceKind::AwsRouteTableAssociation, &name)
            .reference("subnet_id", &id)
            .reference("route_table_id", &route_table),
    )?;

    if let Some(gw) = &gateway {
        let route = Resource::new(ResourceKind::AwsRoute, format!("{name}-default"))
            .attr("destination_cidr_block", "0.0.0.0/0")
            .reference("route_table_id", &route_table);
        let route = match gw {
            Gateway::Internet(igw) => route.reference("gateway_id", igw),
            Gateway::Nat(nat) => route.reference("nat_gateway_id", nat),
        };
        graph.emit(route)?;
    }

    log::debug!(
        "subnet {name} {block} public={} gateway={:?}",
        egress.public,
        gateway
    );

    Ok(Subnet {
        id,
        group: group.to_string(),
        zone: zone.to_string(),
        block,
        public: egress.public,
        route_table,
        gateway,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(s: &str) -> AddressBlock {
        AddressBlock::new(s).unwrap()
    }

    fn vpc() -> ResourceRef {
        ResourceRef::managed(ResourceKind::AwsVpc, "net")
    }

    fn nat(zone: &str) -> NatGateway {
        NatGateway {
            zone: zone.to_string(),
            id: ResourceRef::managed(ResourceKind::AwsNatGateway, format!("net-{zone}")),
            eip: ResourceRef::managed(ResourceKind::AwsEip, format!("net-nat-gateway-{zone}")),
            subnet: ResourceRef::managed(
                ResourceKind::AwsSubnet,
                format!("net-nat_gateway-{zone}"),
            ),
        }
    }

    #[test]
    fn test_public_subnet_routes_to_internet_gateway() {
        let vpc = vpc();
        let igw = ResourceRef::managed(ResourceKind::AwsInternetGateway, "net");
        let tags = BTreeMap::new();
        let ctx = SubnetContext {
            vpc_name: "net",
            vpc_id: &vpc,
            internet_gateway: Some(&igw),
            nat_gateways: None,
            tags: &tags,
        };
        let mut graph = ResourceGraph::new();
        let egress = Egress { public: true, internet: true };
        let subnet = build_subnet(
            &mut graph,
            &ctx,
            "public",
            "eu-west-1a",
            block("10.0.0.0/24"),
            egress,
        )
        .unwrap();

        assert!(subnet.public);
        assert_eq!(subnet.gateway, Some(Gateway::Internet(igw.clone())));
        assert_eq!(subnet.route_table.to_string(), "aws_route_table.net-public-eu-west-1a");
        assert_eq!(graph.len(), 4);

        let s = graph.get(ResourceKind::AwsSubnet, "net-public-eu-west-1a").unwrap();
        assert_eq!(s.attributes["cidr_block"], json!("10.0.0.0/24"));
        assert_eq!(s.attributes["tags"]["group"], json!("public"));
        let route = graph.get(ResourceKind::AwsRoute, "net-public-eu-west-1a-default").unwrap();
        assert_eq!(route.refs["gateway_id"], igw);
    }

    #[test]
    fn test_private_subnet_uses_zone_nat_gateway() {
        let vpc = vpc();
        let tags = BTreeMap::new();
        let nats = vec![nat("a"), nat("b")];
        let ctx = SubnetContext {
            vpc_name: "net",
            vpc_id: &vpc,
            internet_gateway: None,
            nat_gateways: Some(&nats),
            tags: &tags,
        };
        let mut graph = ResourceGraph::new();
        let egress = Egress { public: false, internet: true };
        let subnet =
            build_subnet(&mut graph, &ctx, "private", "b", block("10.0.1.0/24"), egress).unwrap();
        assert_eq!(subnet.gateway, Some(Gateway::Nat(nats[1].id.clone())));
        let route = graph.get(ResourceKind::AwsRoute, "net-private-b-default").unwrap();
        assert_eq!(route.refs["nat_gateway_id"], nats[1].id);
    }

    #[test]
    fn test_isolated_subnet_has_no_default_route() {
        let vpc = vpc();
        let tags = BTreeMap::new();
        let ctx = SubnetContext {
            vpc_name: "net",
            vpc_id: &vpc,
            internet_gateway: None,
            nat_gateways: None,
            tags: &tags,
        };
        let mut graph = ResourceGraph::new();
        let egress = Egress { public: false, internet: false };
        let subnet =
            build_subnet(&mut graph, &ctx, "private", "a", block("10.0.0.0/24"), egress).unwrap();
        assert_eq!(subnet.gateway, None);
        assert_eq!(graph.of_kind(ResourceKind::AwsRoute).count(), 0);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_nat_egress_without_nat_gateway_fails() {
        let vpc = vpc();
        let tags = BTreeMap::new();
        let ctx = SubnetContext {
            vpc_name: "net",
            vpc_id: &vpc,
            internet_gateway: None,
            nat_gateways: None,
            tags: &tags,
        };
        let mut graph = ResourceGraph::new();
        let egress = Egress { public: false, internet: true };
        let err = build_subnet(&mut graph, &ctx, "private", "a", block("10.0.0.0/24"), egress)
            .unwrap_err();
        assert!(matches!(err, TopologyError::Configuration(_)));
        assert!(graph.is_empty());
    }
}
