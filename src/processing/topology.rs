//! VPC topology builder.
//!
//! Validates the request up front, then emits the network in a fixed order:
//! network, DNS zone, DHCP options, internet egress, subnet groups, SSH
//! security group. Each step only references resources of earlier steps.

use super::allocator::FreeSpaceTree;
use super::subnet_factory::{build_subnet, SubnetContext};
use super::{ident, ResourceGraph};
use crate::error::TopologyError;
use crate::models::{
    block_size, clamp_prefix, tags, AddressBlock, DnsZone, Egress, NatGateway, Resource,
    ResourceKind, ResourceRef, Subnet, SubnetGroupSpec, Topology, MAX_LENGTH, NAT_GATEWAY_GROUP,
    SMALLEST_SUBNET_PREFIX,
};
use indexmap::IndexMap;
use itertools::Itertools;
use serde_json::json;
use std::collections::BTreeMap;

pub const DEFAULT_SUBNET_BIT_SIZE: u8 = 24;
pub const DEFAULT_SSH_GROUP: &str = "cloud-team";
pub const DEFAULT_ZONE: &str = "vpc.usw.co";

/// Subnet groups by name; insertion order decides allocation order.
pub type SubnetGroups = IndexMap<String, SubnetGroupSpec>;

/// Settings for one topology build, with provider lookups already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyOptions {
    pub subnet_bit_size: u8,
    pub internet_access: bool,
    /// Pre-created elastic IPs for the NAT gateways, one per zone, or empty.
    pub nat_eips: Vec<ResourceRef>,
    pub tags: BTreeMap<String, String>,
    pub ssh_group: String,
    pub parent_zone: DnsZone,
}

impl TopologyOptions {
    pub fn new(parent_zone: DnsZone) -> Self {
        TopologyOptions {
            subnet_bit_size: DEFAULT_SUBNET_BIT_SIZE,
            internet_access: true,
            nat_eips: vec![],
            tags: BTreeMap::new(),
            ssh_group: DEFAULT_SSH_GROUP.to_string(),
            parent_zone,
        }
    }
}

/// `public` + NAT-backed `private` with internet access, otherwise an
/// isolated `private` group.
pub fn default_groups(internet_access: bool) -> SubnetGroups {
    let mut groups = SubnetGroups::new();
    if internet_access {
        groups.insert("public".to_string(), SubnetGroupSpec::public());
        groups.insert("private".to_string(), SubnetGroupSpec::private(true));
    } else {
        groups.insert("private".to_string(), SubnetGroupSpec::private(false));
    }
    groups
}

/// Addresses the build will take out of the block, NAT subnets included.
pub fn required_space(groups: &SubnetGroups, zones: usize, options: &TopologyOptions) -> u64 {
    let mut per_zone: u64 = groups
        .values()
        .map(|g| block_size(clamp_prefix(g.bit_size.unwrap_or(options.subnet_bit_size))))
        .sum();
    if options.internet_access {
        per_zone += block_size(SMALLEST_SUBNET_PREFIX);
    }
    per_zone * zones as u64
}

fn validate(
    block: AddressBlock,
    azs: &[String],
    groups: &SubnetGroups,
    options: &TopologyOptions,
) -> Result<(), TopologyError> {
    if azs.is_empty() {
        return Err(TopologyError::Configuration(
            "at least one availability zone is required".to_string(),
        ));
    }
    if let Some(zone) = azs.iter().duplicates().next() {
        return Err(TopologyError::Configuration(format!(
            "availability zone {zone} listed more than once"
        )));
    }
    if options.internet_access && groups.contains_key(NAT_GATEWAY_GROUP) {
        return Err(TopologyError::Configuration(format!(
            "subnet group name '{NAT_GATEWAY_GROUP}' is reserved when internet access is enabled"
        )));
    }
    for (name, spec) in groups {
        let bits = spec.bit_size.unwrap_or(options.subnet_bit_size);
        if bits > MAX_LENGTH {
            return Err(TopologyError::Configuration(format!(
                "subnet group '{name}' has invalid bit size /{bits}"
            )));
        }
    }

    let requested = required_space(groups, azs.len(), options);
    if requested > block.size() {
        return Err(TopologyError::Capacity {
            block,
            requested,
            available: block.size(),
        });
    }

    if options.internet_access
        && !options.nat_eips.is_empty()
        && options.nat_eips.len() != azs.len()
    {
        return Err(TopologyError::EipCountMismatch {
            eips: options.nat_eips.len(),
            zones: azs.len(),
        });
    }
    Ok(())
}

/// Allocate one subnet per zone for a group.
fn allocate_group(
    graph: &mut ResourceGraph,
    tree: &mut FreeSpaceTree,
    ctx: &SubnetContext<'_>,
    azs: &[String],
    group: &str,
    bit_size: u8,
    egress: Egress,
) -> Result<Vec<Subnet>, TopologyError> {
    azs.iter()
        .map(|zone| {
            let block = tree.extract(bit_size)?;
            build_subnet(graph, ctx, group, zone, block, egress)
        })
        .collect()
}

/// Build a complete network and emit its resources into `graph`.
///
/// `groups` of `None` selects [`default_groups`]. Nothing is written to
/// `graph` unless the whole build succeeds.
pub fn build_topology(
    graph: &mut ResourceGraph,
    name: &str,
    block: AddressBlock,
    azs: &[String],
    groups: Option<&SubnetGroups>,
    options: &TopologyOptions,
) -> Result<Topology, TopologyError> {
    let defaults;
    let groups = match groups {
        Some(g) => g,
        None => {
            defaults = default_groups(options.internet_access);
            &defaults
        }
    };
    validate(block, azs, groups, options)?;

    log::info!(
        "Building topology {name} {block} across {} zone(s), groups: {}",
        azs.len(),
        groups.keys().join(", ")
    );

    let mut local = ResourceGraph::new();
    let mut tree = FreeSpaceTree::new(block);

    // 1. network
    let vpc_id = local.emit(
        Resource::new(ResourceKind::AwsVpc, name)
            .attr("cidr_block", block.to_string())
            .attr("enable_dns_hostnames", true)
            .attr(
                "tags",
                tags(
                    &[
                        ("Name", name.to_string()),
                        ("ssh_group", options.ssh_group.clone()),
                    ],
                    &options.tags,
                ),
            ),
    )?;

    // 2. dns zone, delegated from the parent
    let fqdn = format!("{name}.{}", options.parent_zone.fqdn);
    let zone_ident = ident(&fqdn);
    let zone_id = local.emit(
        Resource::new(ResourceKind::AwsRoute53Zone, &zone_ident)
            .attr("name", fqdn.as_str())
            .attr("tags", tags(&[], &options.tags))
            .reference("tags.vpc", &vpc_id),
    )?;
    local.emit(
        Resource::new(ResourceKind::AwsRoute53Record, format!("{zone_ident}-ns"))
            .attr("name", fqdn.as_str())
            .attr("type", "NS")
            .attr("ttl", 300)
            .reference("zone_id", &options.parent_zone.id)
            .reference("records", &zone_id),
    )?;

    // 3. dhcp options
    let dhcp = local.emit(
        Resource::new(ResourceKind::AwsVpcDhcpOptions, name)
            .attr("domain_name", fqdn.as_str())
            .attr("domain_name_servers", json!(["AmazonProvidedDNS"]))
            .attr("tags", tags(&[("Name", name.to_string())], &options.tags)),
    )?;
    local.emit(
        Resource::new(ResourceKind::AwsVpcDhcpOptionsAssociation, name)
            .reference("vpc_id", &vpc_id)
            .reference("dhcp_options_id", &dhcp),
    )?;

    let mut subnets: IndexMap<String, Vec<Subnet>> = IndexMap::new();
    let mut internet_gateway = None;
    let mut nat_gateways = None;

    // 4. internet egress
    if options.internet_access {
        let eips = if options.nat_eips.is_empty() {
            azs.iter()
                .map(|az| {
                    local.emit(
                        Resource::new(ResourceKind::AwsEip, format!("{name}-nat-gateway-{az}"))
                            .attr("vpc", true),
                    )
                })
                .collect::<Result<Vec<_>, _>>()?
        } else {
            options.nat_eips.clone()
        };

        let igw = local.emit(
            Resource::new(ResourceKind::AwsInternetGateway, name)
                .attr("tags", tags(&[("Name", name.to_string())], &options.tags))
                .reference("vpc_id", &vpc_id),
        )?;

        let ctx = SubnetContext {
            vpc_name: name,
            vpc_id: &vpc_id,
            internet_gateway: Some(&igw),
            nat_gateways: None,
            tags: &options.tags,
        };
        let nat_subnets = allocate_group(
            &mut local,
            &mut tree,
            &ctx,
            azs,
            NAT_GATEWAY_GROUP,
            SMALLEST_SUBNET_PREFIX,
            Egress {
                public: true,
                internet: true,
            },
        )?;

        let nats = azs
            .iter()
            .zip(&nat_subnets)
            .zip(eips)
            .map(|((az, subnet), eip)| {
                let id = local.emit(
                    Resource::new(ResourceKind::AwsNatGateway, format!("{name}-{az}"))
                        .reference("allocation_id", &eip)
                        .reference("subnet_id", &subnet.id),
                )?;
                Ok(NatGateway {
                    zone: az.clone(),
                    id,
                    eip,
                    subnet: subnet.id.clone(),
                })
            })
            .collect::<Result<Vec<_>, TopologyError>>()?;

        subnets.insert(NAT_GATEWAY_GROUP.to_string(), nat_subnets);
        internet_gateway = Some(igw);
        nat_gateways = Some(nats);
    }

    // 5. caller groups, in the order given
    let ctx = SubnetContext {
        vpc_name: name,
        vpc_id: &vpc_id,
        internet_gateway: internet_gateway.as_ref(),
        nat_gateways: nat_gateways.as_deref(),
        tags: &options.tags,
    };
    for (group, spec) in groups {
        let bit_size = spec.bit_size.unwrap_or(options.subnet_bit_size);
        let egress = spec.egress(options.internet_access);
        let group_subnets =
            allocate_group(&mut local, &mut tree, &ctx, azs, group, bit_size, egress)?;
        subnets.insert(group.clone(), group_subnets);
    }

    // 6. ssh between hosts of this network only
    let ssh_rule = json!([{
        "from_port": 22,
        "to_port": 22,
        "protocol": "tcp",
        "cidr_blocks": [block.to_string()],
    }]);
    let sg_name = format!("{name}-internal-ssh");
    let internal_ssh_security_group = local.emit(
        Resource::new(ResourceKind::AwsSecurityGroup, &sg_name)
            .attr("name", sg_name.as_str())
            .attr(
                "description",
                "Allows SSH between machines inside the VPC CIDR",
            )
            .attr("tags", tags(&[], &options.tags))
            .attr("ingress", ssh_rule.clone())
            .attr("egress", ssh_rule)
            .reference("vpc_id", &vpc_id),
    )?;

    log::info!(
        "Topology {name}: {} resources, {} addresses left unallocated",
        local.len(),
        tree.free_size()
    );
    graph.merge(local)?;

    Ok(Topology {
        name: name.to_string(),
        id: vpc_id,
        block,
        zone: DnsZone {
            fqdn,
            id: zone_id,
        },
        azs: azs.to_vec(),
        subnets,
        internet_gateway,
        nat_gateways,
        internal_ssh_security_group,
        ssh_group: options.ssh_group.clone(),
        tags: options.tags.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(s: &str) -> AddressBlock {
        AddressBlock::new(s).unwrap()
    }

    fn zones(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn options(internet_access: bool) -> TopologyOptions {
        let mut options = TopologyOptions::new(DnsZone {
            fqdn: "vpc.example.com".to_string(),
            id: ResourceRef::existing(ResourceKind::AwsRoute53Zone, "Z123"),
        });
        options.internet_access = internet_access;
        options
    }

    fn all_blocks(t: &Topology) -> Vec<AddressBlock> {
        t.all_subnets().iter().map(|s| s.block).collect()
    }

    #[test]
    fn test_private_only_without_internet() {
        let mut graph = ResourceGraph::new();
        let t = build_topology(
            &mut graph,
            "net",
            block("10.0.0.0/16"),
            &zones(&["a", "b", "c"]),
            None,
            &options(false),
        )
        .unwrap();

        assert_eq!(t.subnets.keys().collect::<Vec<_>>(), vec!["private"]);
        let private = &t.subnets["private"];
        assert_eq!(private.len(), 3);
        assert_eq!(
            private.iter().map(|s| s.zone.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert!(private.iter().all(|s| s.gateway.is_none() && !s.public));
        assert!(private.iter().all(|s| s.block.prefix() == 24));
        assert_eq!(t.internet_gateway, None);
        assert_eq!(t.nat_gateways, None);
        assert_eq!(graph.of_kind(ResourceKind::AwsNatGateway).count(), 0);
        assert_eq!(graph.of_kind(ResourceKind::AwsRoute).count(), 0);
    }

    #[test]
    fn test_internet_access_two_zones() {
        let mut graph = ResourceGraph::new();
        let t = build_topology(
            &mut graph,
            "net",
            block("10.0.0.0/16"),
            &zones(&["a", "b"]),
            None,
            &options(true),
        )
        .unwrap();

        assert_eq!(graph.of_kind(ResourceKind::AwsEip).count(), 2);
        assert_eq!(graph.of_kind(ResourceKind::AwsInternetGateway).count(), 1);
        assert_eq!(graph.of_kind(ResourceKind::AwsNatGateway).count(), 2);
        assert_eq!(t.subnets["public"].len(), 2);
        assert_eq!(t.subnets["private"].len(), 2);
        assert_eq!(t.subnets[NAT_GATEWAY_GROUP].len(), 2);

        let nats = t.nat_gateways.as_ref().unwrap();
        for (subnet, nat) in t.subnets["private"].iter().zip(nats) {
            assert_eq!(subnet.zone, nat.zone);
            assert_eq!(subnet.gateway, Some(crate::models::Gateway::Nat(nat.id.clone())));
        }
        let igw = t.internet_gateway.clone().unwrap();
        assert!(t.subnets["public"]
            .iter()
            .all(|s| s.public && s.gateway == Some(crate::models::Gateway::Internet(igw.clone()))));
        assert!(t.subnets[NAT_GATEWAY_GROUP].iter().all(|s| s.block.prefix() == 28));
    }

    #[test]
    fn test_subnets_are_disjoint_and_inside_block() {
        let total = block("10.20.0.0/20");
        let mut groups = SubnetGroups::new();
        groups.insert("web".to_string(), SubnetGroupSpec::public().with_bit_size(26));
        groups.insert("app".to_string(), SubnetGroupSpec::private(true));
        groups.insert("db".to_string(), SubnetGroupSpec::private(false).with_bit_size(27));
        let mut graph = ResourceGraph::new();
        let t = build_topology(
            &mut graph,
            "net",
            total,
            &zones(&["a", "b", "c"]),
            Some(&groups),
            &options(true),
        )
        .unwrap();

        let blocks = all_blocks(&t);
        assert_eq!(blocks.len(), 12);
        for (i, a) in blocks.iter().enumerate() {
            assert!(total.contains(a.first()) && total.contains(a.last()));
            for b in &blocks[i + 1..] {
                assert!(!a.intersects(b), "{a} overlaps {b}");
            }
        }
        assert!(t.subnets["db"].iter().all(|s| s.gateway.is_none()));
    }

    #[test]
    fn test_groups_keep_caller_order() {
        let mut groups = SubnetGroups::new();
        groups.insert("zeta".to_string(), SubnetGroupSpec::private(false));
        groups.insert("alpha".to_string(), SubnetGroupSpec::private(false));
        let mut graph = ResourceGraph::new();
        let t = build_topology(
            &mut graph,
            "net",
            block("10.0.0.0/16"),
            &zones(&["a"]),
            Some(&groups),
            &options(false),
        )
        .unwrap();
        assert_eq!(t.subnets.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(t.subnets["zeta"][0].block, block("10.0.0.0/24"));
        assert_eq!(t.subnets["alpha"][0].block, block("10.0.1.0/24"));
    }

    #[test]
    fn test_capacity_exact_fit_and_one_over() {
        // a /22 holds exactly four /24s
        let mut groups = SubnetGroups::new();
        groups.insert("private".to_string(), SubnetGroupSpec::private(false));

        let mut graph = ResourceGraph::new();
        let t = build_topology(
            &mut graph,
            "fits",
            block("10.0.0.0/22"),
            &zones(&["a", "b", "c", "d"]),
            Some(&groups),
            &options(false),
        )
        .unwrap();
        assert_eq!(t.subnets["private"].len(), 4);

        let mut graph = ResourceGraph::new();
        let err = build_topology(
            &mut graph,
            "too-big",
            block("10.0.0.0/22"),
            &zones(&["a", "b", "c", "d", "e"]),
            Some(&groups),
            &options(false),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TopologyError::Capacity {
                block: block("10.0.0.0/22"),
                requested: 1280,
                available: 1024,
            }
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn test_capacity_counts_nat_subnets() {
        let mut graph = ResourceGraph::new();
        let mut groups = SubnetGroups::new();
        groups.insert("private".to_string(), SubnetGroupSpec::private(true));
        let err = build_topology(
            &mut graph,
            "net",
            block("10.0.0.0/23"),
            &zones(&["a", "b"]),
            Some(&groups),
            &options(true),
        )
        .unwrap_err();
        assert!(matches!(err, TopologyError::Capacity { requested: 544, .. }));
    }

    #[test]
    fn test_eip_count_mismatch() {
        let mut opts = options(true);
        opts.nat_eips = vec![ResourceRef::existing(ResourceKind::AwsEip, "eipalloc-1")];
        let mut graph = ResourceGraph::new();
        let err = build_topology(
            &mut graph,
            "net",
            block("10.0.0.0/16"),
            &zones(&["a", "b", "c"]),
            None,
            &opts,
        )
        .unwrap_err();
        assert_eq!(err, TopologyError::EipCountMismatch { eips: 1, zones: 3 });
        assert!(graph.is_empty());
    }

    #[test]
    fn test_supplied_eips_are_used() {
        let mut opts = options(true);
        opts.nat_eips = vec![
            ResourceRef::existing(ResourceKind::AwsEip, "eipalloc-1"),
            ResourceRef::existing(ResourceKind::AwsEip, "eipalloc-2"),
        ];
        let mut graph = ResourceGraph::new();
        let t = build_topology(
            &mut graph,
            "net",
            block("10.0.0.0/16"),
            &zones(&["a", "b"]),
            None,
            &opts,
        )
        .unwrap();
        assert_eq!(graph.of_kind(ResourceKind::AwsEip).count(), 0);
        let nats = t.nat_gateways.unwrap();
        assert_eq!(nats[1].eip, opts.nat_eips[1]);
    }

    #[test]
    fn test_nat_egress_without_internet_access() {
        let mut groups = SubnetGroups::new();
        groups.insert("private".to_string(), SubnetGroupSpec::private(true));
        let mut graph = ResourceGraph::new();
        let err = build_topology(
            &mut graph,
            "net",
            block("10.0.0.0/16"),
            &zones(&["a"]),
            Some(&groups),
            &options(false),
        )
        .unwrap_err();
        assert!(matches!(err, TopologyError::Configuration(_)));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_rejects_empty_zones() {
        let mut graph = ResourceGraph::new();
        let err = build_topology(
            &mut graph,
            "net",
            block("10.0.0.0/16"),
            &[],
            None,
            &options(false),
        )
        .unwrap_err();
        assert!(matches!(err, TopologyError::Configuration(_)));
    }

    #[test]
    fn test_construction_order() {
        let mut graph = ResourceGraph::new();
        build_topology(
            &mut graph,
            "net",
            block("10.0.0.0/16"),
            &zones(&["a"]),
            None,
            &options(true),
        )
        .unwrap();
        let kinds: Vec<ResourceKind> = graph.resources().iter().map(|r| r.kind).collect();
        let position = |k: ResourceKind| kinds.iter().position(|x| *x == k).unwrap();
        assert_eq!(kinds[0], ResourceKind::AwsVpc);
        assert!(position(ResourceKind::AwsRoute53Zone) < position(ResourceKind::AwsVpcDhcpOptions));
        assert!(position(ResourceKind::AwsVpcDhcpOptions) < position(ResourceKind::AwsEip));
        assert!(position(ResourceKind::AwsInternetGateway) < position(ResourceKind::AwsNatGateway));
        assert_eq!(*kinds.last().unwrap(), ResourceKind::AwsSecurityGroup);

        let zone = graph
            .get(ResourceKind::AwsRoute53Zone, "net-vpc-example-com")
            .unwrap();
        assert_eq!(zone.attributes["name"], json!("net.vpc.example.com"));
        let sg = graph
            .get(ResourceKind::AwsSecurityGroup, "net-internal-ssh")
            .unwrap();
        assert_eq!(sg.attributes["ingress"][0]["cidr_blocks"], json!(["10.0.0.0/16"]));
        assert_eq!(sg.attributes["egress"][0]["from_port"], json!(22));
    }

    #[test]
    fn test_identical_input_identical_output() {
        let build = || {
            let mut graph = ResourceGraph::new();
            let t = build_topology(
                &mut graph,
                "net",
                block("10.0.0.0/16"),
                &zones(&["a", "b", "c"]),
                None,
                &options(true),
            )
            .unwrap();
            (t, serde_json::to_string(&graph).unwrap())
        };
        assert_eq!(build(), build());
    }
}
