//! Resource descriptors handed to the serialization collaborator.
//!
//! A [`Resource`] is an opaque (kind, name, attributes, refs) tuple. Links
//! between resources are typed [`ResourceRef`] handles; turning them into the
//! sink's own reference syntax happens outside this crate.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Resource kinds emitted by the builder and the peering resolver.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    AwsVpc,
    AwsRoute53Zone,
    AwsRoute53Record,
    AwsVpcDhcpOptions,
    AwsVpcDhcpOptionsAssociation,
    AwsEip,
    AwsInternetGateway,
    AwsNatGateway,
    AwsSubnet,
    AwsRouteTable,
    AwsRouteTableAssociation,
    AwsRoute,
    AwsSecurityGroup,
    AwsVpcPeeringConnection,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::AwsVpc => "aws_vpc",
            ResourceKind::AwsRoute53Zone => "aws_route53_zone",
            ResourceKind::AwsRoute53Record => "aws_route53_record",
            ResourceKind::AwsVpcDhcpOptions => "aws_vpc_dhcp_options",
            ResourceKind::AwsVpcDhcpOptionsAssociation => "aws_vpc_dhcp_options_association",
            ResourceKind::AwsEip => "aws_eip",
            ResourceKind::AwsInternetGateway => "aws_internet_gateway",
            ResourceKind::AwsNatGateway => "aws_nat_gateway",
            ResourceKind::AwsSubnet => "aws_subnet",
            ResourceKind::AwsRouteTable => "aws_route_table",
            ResourceKind::AwsRouteTableAssociation => "aws_route_table_association",
            ResourceKind::AwsRoute => "aws_route",
            ResourceKind::AwsSecurityGroup => "aws_security_group",
            ResourceKind::AwsVpcPeeringConnection => "aws_vpc_peering_connection",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed handle to another resource.
///
/// `Managed` points at a resource emitted in this run, `Existing` at one that
/// already lives in the provider (found through a lookup).
#[derive(Serialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(untagged)]
pub enum ResourceRef {
    Managed { kind: ResourceKind, name: String },
    Existing { kind: ResourceKind, id: String },
}

impl ResourceRef {
    pub fn managed(kind: ResourceKind, name: impl Into<String>) -> Self {
        ResourceRef::Managed {
            kind,
            name: name.into(),
        }
    }

    pub fn existing(kind: ResourceKind, id: impl Into<String>) -> Self {
        ResourceRef::Existing {
            kind,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRef::Managed { kind, .. } | ResourceRef::Existing { kind, .. } => *kind,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Managed { kind, name } => write!(f, "{kind}.{name}"),
            ResourceRef::Existing { id, .. } => f.write_str(id),
        }
    }
}

/// One emitted resource.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub name: String,
    /// Literal attributes, no references inside.
    pub attributes: Map<String, Value>,
    /// Attribute name to referenced resource, e.g. `vpc_id` -> the network.
    pub refs: BTreeMap<String, ResourceRef>,
}

impl Resource {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Resource {
            kind,
            name: name.into(),
            attributes: Map::new(),
            refs: BTreeMap::new(),
        }
    }

    pub fn attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn reference(mut self, key: &str, target: &ResourceRef) -> Self {
        self.refs.insert(key.to_string(), target.clone());
        self
    }

    /// Handle other resources use to point at this one.
    pub fn handle(&self) -> ResourceRef {
        ResourceRef::managed(self.kind, self.name.clone())
    }
}

/// Build a `tags` attribute: the resource's own tags overlaid by the caller's.
pub fn tags(own: &[(&str, String)], extra: &BTreeMap<String, String>) -> Value {
    let mut map: Map<String, Value> = own
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
        .collect();
    for (k, v) in extra {
        map.insert(k.clone(), Value::String(v.clone()));
    }
    Value::Object(map)
}
