//! Terminal output utilities.
//!
//! Provides formatting helpers and the colored run summary.

use super::csv::{subnet_rows, SUBNET_HEADER};
use crate::models::{ResourceRef, Topology};
use crate::processing::Generation;
use colored::Colorize;

/// Quote a value and right-align it in a CSV column.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - Column width; longer values are never cut
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let quoted = format!("\"{}\"", value.to_string());
    format!("{quoted:>width$}")
}

/// One-line heading for a topology; existing networks are marked.
pub fn topology_heading(topology: &Topology) -> String {
    let origin = match topology.id {
        ResourceRef::Existing { .. } => "existing",
        ResourceRef::Managed { .. } => "new",
    };
    format!("# {topology} {origin} ssh_group={}", topology.ssh_group)
}

/// Print every topology with its subnets, then the peerings.
pub fn print_summary(run: &Generation) {
    log::info!("#Start print_summary() topologies={}", run.topologies.len());
    for topology in run.topologies.values() {
        println!("{}", topology_heading(topology).bold());
        println!("{SUBNET_HEADER}");
        for row in subnet_rows(topology) {
            println!("{row}");
        }
    }
    for link in &run.peerings {
        println!(
            "#{}# {} {} <-> {} {} routes={}+{}",
            "PEER".on_blue(),
            link.ours,
            link.our_block,
            link.theirs,
            link.their_block,
            link.our_route_tables.len(),
            link.their_route_tables.len()
        );
    }
    println!(
        "#{}# {} resources generated",
        "NOTE".on_green(),
        run.graph.len()
    );
}
