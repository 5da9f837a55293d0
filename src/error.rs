//! Error type shared by the allocator, builder, peering and provider layers.

use crate::models::AddressBlock;
use thiserror::Error;

/// Every failure is terminal for the current generation run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// Requested subnet space does not fit in the network block.
    #[error("not enough space for subnets in {block}: requested {requested} addresses, block holds {available}")]
    Capacity {
        block: AddressBlock,
        requested: u64,
        available: u64,
    },

    /// The free-space tree has no block large enough.
    #[error("run out of ip space to allocate a /{prefix}")]
    OutOfSpace { prefix: u8 },

    /// Peered networks share address space.
    #[error("networks to be peered have overlapping blocks: {ours} and {theirs}")]
    OverlappingAddressSpace {
        ours: AddressBlock,
        theirs: AddressBlock,
    },

    /// Supplied NAT elastic IPs do not line up with the zones.
    #[error("the number of nat eips ({eips}) has to match the number of zones ({zones})")]
    EipCountMismatch { eips: usize, zones: usize },

    #[error("configuration error: {0}")]
    Configuration(String),

    /// A provider lookup returned nothing.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("invalid address block: {0}")]
    InvalidBlock(String),

    #[error("duplicate resource: {0}")]
    DuplicateResource(String),

    #[error("provider query failed: {0}")]
    Provider(String),

    #[error("config error: {0}")]
    Config(String),

    /// Writing the generated resources failed.
    #[error("output error: {0}")]
    Output(String),
}

impl TopologyError {
    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        TopologyError::NotFound {
            kind,
            name: name.into(),
        }
    }
}
