//! Live provider lookups through the `aws` command line.

use super::cli::run_json;
use super::{same_fqdn, NetworkSnapshot, ProviderQuery, SubnetSnapshot, ZoneSnapshot};
use crate::error::TopologyError;
use crate::models::{AddressBlock, DnsZone};
use crate::processing::ident;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsTag {
    key: String,
    value: String,
}

fn tag_map(tags: &[AwsTag]) -> BTreeMap<String, String> {
    tags.iter()
        .map(|t| (t.key.clone(), t.value.clone()))
        .collect()
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct DescribeAvailabilityZones {
    availability_zones: Vec<AwsAvailabilityZone>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsAvailabilityZone {
    zone_name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct ListHostedZones {
    hosted_zones: Vec<AwsHostedZone>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsHostedZone {
    id: String,
    name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct DescribeVpcs {
    vpcs: Vec<AwsVpc>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsVpc {
    vpc_id: String,
    cidr_block: String,
    dhcp_options_id: Option<String>,
    #[serde(default)]
    tags: Vec<AwsTag>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct DescribeSubnets {
    subnets: Vec<AwsSubnet>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsSubnet {
    subnet_id: String,
    availability_zone: String,
    cidr_block: String,
    #[serde(default)]
    tags: Vec<AwsTag>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct DescribeRouteTables {
    route_tables: Vec<AwsRouteTable>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsRouteTable {
    route_table_id: String,
    #[serde(default)]
    associations: Vec<AwsRouteTableAssociation>,
    #[serde(default)]
    routes: Vec<AwsRoute>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsRouteTableAssociation {
    subnet_id: Option<String>,
    #[serde(default)]
    main: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsRoute {
    gateway_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct DescribeDhcpOptions {
    dhcp_options: Vec<AwsDhcpOptions>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsDhcpOptions {
    dhcp_configurations: Vec<AwsDhcpConfiguration>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsDhcpConfiguration {
    key: String,
    values: Vec<AwsAttributeValue>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsAttributeValue {
    value: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecurityGroups {
    security_groups: Vec<AwsSecurityGroup>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct AwsSecurityGroup {
    group_id: String,
}

/// Queries the provider by shelling out to `aws`.
#[derive(Debug, Clone, Default)]
pub struct AwsCliProvider {
    region: Option<String>,
}

impl AwsCliProvider {
    pub fn new(region: Option<String>) -> Self {
        AwsCliProvider { region }
    }

    fn command(&self, args: &str) -> String {
        match &self.region {
            Some(region) => format!("aws {args} --region {region} --output json"),
            None => format!("aws {args} --output json"),
        }
    }

    fn zone_by_id(&self, id: &str) -> String {
        id.trim_start_matches("/hostedzone/").to_string()
    }

    fn domain_name(&self, dhcp_options_id: &str) -> Result<Option<String>, TopologyError> {
        let out: DescribeDhcpOptions = run_json(&self.command(&format!(
            "ec2 describe-dhcp-options --dhcp-options-ids {dhcp_options_id}"
        )))?;
        Ok(out
            .dhcp_options
            .into_iter()
            .flat_map(|o| o.dhcp_configurations)
            .find(|c| c.key == "domain-name")
            .and_then(|c| c.values.into_iter().next())
            .map(|v| v.value))
    }
}

impl ProviderQuery for AwsCliProvider {
    fn availability_zones(&self) -> Result<Vec<String>, TopologyError> {
        let out: DescribeAvailabilityZones =
            run_json(&self.command("ec2 describe-availability-zones"))?;
        if out.availability_zones.is_empty() {
            return Err(TopologyError::not_found(
                "availability zones",
                self.region.clone().unwrap_or_default(),
            ));
        }
        Ok(out
            .availability_zones
            .into_iter()
            .map(|z| z.zone_name)
            .collect())
    }

    fn find_zone(&self, fqdn: &str) -> Result<DnsZone, TopologyError> {
        let out: ListHostedZones = run_json(&self.command(&format!(
            "route53 list-hosted-zones-by-name --dns-name {fqdn} --max-items 1"
        )))?;
        out.hosted_zones
            .iter()
            .find(|z| same_fqdn(&z.name, fqdn))
            .map(|z| {
                DnsZone::from(&ZoneSnapshot {
                    fqdn: z.name.clone(),
                    id: self.zone_by_id(&z.id),
                })
            })
            .ok_or_else(|| TopologyError::not_found("zone", fqdn))
    }

    fn find_network(&self, name: &str) -> Result<NetworkSnapshot, TopologyError> {
        let vpcs: DescribeVpcs = run_json(&self.command(&format!(
            "ec2 describe-vpcs --filters 'Name=tag:Name,Values={name}'"
        )))?;
        let vpc = vpcs
            .vpcs
            .into_iter()
            .next()
            .ok_or_else(|| TopologyError::not_found("network", name))?;
        log::debug!("Found network {name} as {}", vpc.vpc_id);

        let vpc_filter = format!("'Name=vpc-id,Values={}'", vpc.vpc_id);
        let subnets: DescribeSubnets = run_json(
            &self.command(&format!("ec2 describe-subnets --filters {vpc_filter}")),
        )?;
        let route_tables: DescribeRouteTables = run_json(
            &self.command(&format!("ec2 describe-route-tables --filters {vpc_filter}")),
        )?;

        let zone = match &vpc.dhcp_options_id {
            Some(id) => match self.domain_name(id)? {
                Some(domain) => match self.find_zone(&domain) {
                    Ok(zone) => Some(ZoneSnapshot {
                        fqdn: zone.fqdn,
                        id: zone.id.to_string(),
                    }),
                    Err(TopologyError::NotFound { .. }) => None,
                    Err(e) => return Err(e),
                },
                None => None,
            },
            None => None,
        };

        let groups: DescribeSecurityGroups = run_json(&self.command(&format!(
            "ec2 describe-security-groups --filters {vpc_filter} 'Name=group-name,Values={}-internal-ssh'",
            ident(name)
        )))?;
        let ssh_security_group = groups
            .security_groups
            .into_iter()
            .next()
            .map(|g| g.group_id);

        assemble_network(
            name,
            vpc,
            subnets.subnets,
            route_tables.route_tables,
            zone,
            ssh_security_group,
        )
    }
}

/// Join the separate describe calls into one snapshot.
///
/// A subnet uses the route table explicitly associated with it, or the main
/// table. It is public when that table routes through an internet gateway.
fn assemble_network(
    name: &str,
    vpc: AwsVpc,
    subnets: Vec<AwsSubnet>,
    route_tables: Vec<AwsRouteTable>,
    zone: Option<ZoneSnapshot>,
    ssh_security_group: Option<String>,
) -> Result<NetworkSnapshot, TopologyError> {
    let main_table = route_tables
        .iter()
        .find(|t| t.associations.iter().any(|a| a.main));

    let subnets = subnets
        .into_iter()
        .map(|s| {
            let table = route_tables
                .iter()
                .find(|t| {
                    t.associations
                        .iter()
                        .any(|a| a.subnet_id.as_deref() == Some(s.subnet_id.as_str()))
                })
                .or(main_table)
                .ok_or_else(|| {
                    TopologyError::not_found("route table for subnet", s.subnet_id.clone())
                })?;
            let public = table.routes.iter().any(|r| {
                r.gateway_id
                    .as_deref()
                    .is_some_and(|g| g.starts_with("igw-"))
            });
            Ok(SubnetSnapshot {
                cidr: AddressBlock::new(&s.cidr_block)?,
                route_table: table.route_table_id.clone(),
                public,
                tags: tag_map(&s.tags),
                id: s.subnet_id,
                zone: s.availability_zone,
            })
        })
        .collect::<Result<Vec<_>, TopologyError>>()?;

    Ok(NetworkSnapshot {
        name: name.to_string(),
        cidr: AddressBlock::new(&vpc.cidr_block)?,
        tags: tag_map(&vpc.tags),
        id: vpc.vpc_id,
        zone,
        subnets,
        ssh_security_group,
    })
}
