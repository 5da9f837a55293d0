//! Subnet descriptors and subnet-group egress settings.

use super::{AddressBlock, ResourceRef};
use serde::{Deserialize, Serialize};

/// Name of the per-zone NAT subnet group created for internet access.
pub const NAT_GATEWAY_GROUP: &str = "nat_gateway";

/// Tag key every subnet carries with its group name.
pub const GROUP_TAG: &str = "group";

/// Egress and size settings shared by every subnet of a group.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SubnetGroupSpec {
    /// Route through the internet gateway and assign public IPs.
    #[serde(default)]
    pub public: bool,
    /// Private subnets route out through the zone's NAT gateway.
    /// Unset means "follow the network's internet access setting".
    #[serde(default)]
    pub internet: Option<bool>,
    /// Prefix length of each subnet; the network default when unset.
    #[serde(default)]
    pub bit_size: Option<u8>,
}

impl SubnetGroupSpec {
    pub fn public() -> Self {
        SubnetGroupSpec {
            public: true,
            ..Default::default()
        }
    }

    pub fn private(internet: bool) -> Self {
        SubnetGroupSpec {
            internet: Some(internet),
            ..Default::default()
        }
    }

    pub fn with_bit_size(mut self, bit_size: u8) -> Self {
        self.bit_size = Some(bit_size);
        self
    }

    /// Settle the optional fields against the network defaults.
    pub fn egress(&self, internet_access: bool) -> Egress {
        Egress {
            public: self.public,
            internet: self.internet.unwrap_or(internet_access),
        }
    }
}

/// Resolved egress of one subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Egress {
    pub public: bool,
    pub internet: bool,
}

/// Gateway a subnet's default route points at.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "ref", rename_all = "snake_case")]
pub enum Gateway {
    Internet(ResourceRef),
    Nat(ResourceRef),
}

/// One subnet in one availability zone.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub id: ResourceRef,
    pub group: String,
    pub zone: String,
    pub block: AddressBlock,
    pub public: bool,
    pub route_table: ResourceRef,
    pub gateway: Option<Gateway>,
}
