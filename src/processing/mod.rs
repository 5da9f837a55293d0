//! Topology construction logic.
//!
//! This module contains the core of the crate:
//! - [`allocator`] - Free-space tree carving subnets out of a block
//! - [`subnet_factory`] - One subnet with its route table and default route
//! - [`topology`] - Building a full network
//! - [`peering`] - Peering two networks
//! - [`lookup`] - Rebuilding a topology from provider data
//! - [`generate`] - Running a whole config

pub mod allocator;
mod generate;
mod graph;
mod lookup;
pub mod peering;
pub mod subnet_factory;
pub mod topology;

use regex::Regex;
use std::sync::OnceLock;

// Re-export public functions
pub use allocator::FreeSpaceTree;
pub use generate::{generate, Generation};
pub use graph::ResourceGraph;
pub use lookup::find_topology;
pub use peering::peer_with;
pub use topology::{
    build_topology, default_groups, SubnetGroups, TopologyOptions, DEFAULT_SSH_GROUP,
    DEFAULT_SUBNET_BIT_SIZE, DEFAULT_ZONE,
};

static IDENT_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_ident_regex() -> &'static Regex {
    IDENT_REGEX.get_or_init(|| Regex::new(r"[\s.]").expect("Invalid Regex"))
}

/// Resource-name form of a network or zone name: whitespace and dots become dashes.
pub fn ident(name: &str) -> String {
    get_ident_regex().replace_all(name, "-").into_owned()
}
