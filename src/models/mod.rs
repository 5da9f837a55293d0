//! Domain models for topology generation.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`AddressBlock`] - IPv4 CIDR block with split support
//! - [`Resource`] and [`ResourceRef`] - emitted resources and typed links
//! - [`Subnet`] and [`SubnetGroupSpec`] - subnets and their group settings
//! - [`Topology`] and [`PeeringLink`] - built networks and peerings

mod block;
mod resource;
mod subnet;
mod vpc;

// Re-export public types
pub use block::{
    block_size, broadcast_addr, clamp_prefix, cut_addr, get_cidr_mask, AddressBlock, MAX_LENGTH,
    SMALLEST_SUBNET_PREFIX,
};
pub use resource::{tags, Resource, ResourceKind, ResourceRef};
pub use subnet::{Egress, Gateway, Subnet, SubnetGroupSpec, GROUP_TAG, NAT_GATEWAY_GROUP};
pub use vpc::{DnsZone, NatGateway, PeeringLink, Topology};
