//! Generates AWS VPC topologies as an ordered graph of resource descriptors.
//!
//! Networks are carved into per-zone subnets with a buddy-style free-space
//! tree, wired to internet and NAT gateways, given a delegated DNS zone and
//! peered with each other or with networks that already exist.

pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod processing;
pub mod provider;

pub use config::{GeneratorConfig, NetworkConfig, PeeringConfig};
pub use error::TopologyError;
pub use processing::{
    build_topology, find_topology, generate, peer_with, FreeSpaceTree, Generation, ResourceGraph,
    TopologyOptions,
};
pub use provider::{AwsCliProvider, ProviderQuery, SnapshotProvider};
