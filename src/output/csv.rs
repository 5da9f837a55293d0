//! CSV rows describing the subnets of a topology.

use crate::models::{Gateway, Subnet, Topology};

use super::terminal::format_field;

/// Header matching [`subnet_row`].
pub const SUBNET_HEADER: &str = r#""cnt",        "network",     "group",        "zone",         "subnet_cidr", "broadcast",         "public", "gateway""#;

fn gateway(subnet: &Subnet) -> String {
    match &subnet.gateway {
        Some(Gateway::Internet(r)) => format!("igw:{r}"),
        Some(Gateway::Nat(r)) => format!("nat:{r}"),
        None => "none".to_string(),
    }
}

/// One subnet as a quoted CSV row.
///
/// # Arguments
/// * `j` - Row counter
/// * `network` - Name of the owning network
/// * `subnet` - The subnet to print
pub fn subnet_row(j: usize, network: &str, subnet: &Subnet) -> String {
    format!(
        r#"{j},{network},{group},{zone},{cidr},{broadcast},{public},{gateway}"#,
        j = format_field(j, 6),
        network = format_field(network, 16),
        group = format_field(&subnet.group, 16),
        zone = format_field(&subnet.zone, 16),
        cidr = format_field(subnet.block, 18),
        broadcast = format_field(format!("{}_br", subnet.block.last()), 19),
        public = format_field(subnet.public, 8),
        gateway = format_field(gateway(subnet), 0),
    )
}

/// Rows for every subnet of `topology`, in group then zone order.
pub fn subnet_rows(topology: &Topology) -> Vec<String> {
    topology
        .all_subnets()
        .iter()
        .enumerate()
        .map(|(j, s)| subnet_row(j + 1, &topology.name, s))
        .collect()
}
