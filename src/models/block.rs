//! IPv4 address blocks in CIDR notation.
//!
//! Provides [`AddressBlock`] for a contiguous (base address, prefix length)
//! range, along with the mask arithmetic the allocator is built on.

use crate::error::TopologyError;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Maximum length for an IPv4 prefix (32 bits).
pub const MAX_LENGTH: u8 = 32;

/// Smallest subnet the provider accepts. Larger prefix lengths are clamped to this.
pub const SMALLEST_SUBNET_PREFIX: u8 = 28;

/// Convert a CIDR prefix length to a subnet mask as u32.
///
/// # Examples
/// ```
/// use vpc_topology::models::get_cidr_mask;
/// assert_eq!(get_cidr_mask(24).unwrap(), 0xFFFFFF00);
/// ```
pub fn get_cidr_mask(len: u8) -> Result<u32, TopologyError> {
    if len > MAX_LENGTH {
        Err(TopologyError::InvalidBlock(format!(
            "prefix length /{len} is too long"
        )))
    } else {
        let right_len = MAX_LENGTH - len;
        let all_bits = u32::MAX as u64;

        let mask = (all_bits >> right_len) << right_len;

        Ok(mask as u32)
    }
}

/// Get the network address for a given IP and prefix length.
pub fn cut_addr(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr, TopologyError> {
    let mask = get_cidr_mask(len)?;
    Ok(Ipv4Addr::from(u32::from(addr) & mask))
}

/// Calculate the broadcast (last) address for a given IP and prefix length.
pub fn broadcast_addr(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr, TopologyError> {
    let mask = get_cidr_mask(len)?;
    let network_bits = u32::from(addr) & mask;
    Ok(Ipv4Addr::from(network_bits | !mask))
}

/// Number of addresses covered by a prefix length.
pub fn block_size(len: u8) -> u64 {
    1u64 << (MAX_LENGTH - len.min(MAX_LENGTH))
}

/// Clamp a requested prefix length so no block is smaller than a /28.
pub fn clamp_prefix(len: u8) -> u8 {
    len.min(SMALLEST_SUBNET_PREFIX)
}

/// A contiguous IPv4 range. The base address is always the network address.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Copy, Clone, Hash)]
pub struct AddressBlock {
    addr: Ipv4Addr,
    prefix: u8,
}

impl AddressBlock {
    /// Create a new [`AddressBlock`] from a CIDR string (e.g. "10.0.0.0/16").
    ///
    /// Host bits are cleared, so "10.0.3.7/16" becomes "10.0.0.0/16".
    pub fn new(addr_cidr: &str) -> Result<AddressBlock, TopologyError> {
        let addr_cidr = addr_cidr.trim();
        let (addr, prefix) = addr_cidr
            .split_once('/')
            .ok_or_else(|| TopologyError::InvalidBlock(format!("missing '/' in {addr_cidr}")))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| TopologyError::InvalidBlock(format!("invalid address {addr}")))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| TopologyError::InvalidBlock(format!("invalid prefix length {prefix}")))?;
        AddressBlock::from_parts(addr, prefix)
    }

    pub fn from_parts(addr: Ipv4Addr, prefix: u8) -> Result<AddressBlock, TopologyError> {
        Ok(AddressBlock {
            addr: cut_addr(addr, prefix)?,
            prefix,
        })
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Number of addresses in the block.
    pub fn size(&self) -> u64 {
        block_size(self.prefix)
    }

    /// Lowest (network) address in the block.
    pub fn first(&self) -> Ipv4Addr {
        self.addr
    }

    /// Highest (broadcast) address in the block.
    pub fn last(&self) -> Ipv4Addr {
        let last = u32::from(self.addr) as u64 + self.size() - 1;
        Ipv4Addr::from(last as u32)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.first() <= addr && addr <= self.last()
    }

    /// True when the two ranges share at least one address.
    pub fn intersects(&self, other: &AddressBlock) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// Split off the lowest sub-block with the given prefix length.
    ///
    /// Returns the sub-block and the remainder blocks covering the rest of
    /// `self`, in ascending address order. Remainders double in size as the
    /// address grows: a /16 split to /24 leaves a /24, a /23, ... up to a /17.
    pub fn split(&self, prefix: u8) -> Result<(AddressBlock, Vec<AddressBlock>), TopologyError> {
        if prefix < self.prefix || prefix > MAX_LENGTH {
            return Err(TopologyError::InvalidBlock(format!(
                "{self} can not be split into /{prefix} blocks"
            )));
        }
        let base = u32::from(self.addr) as u64;
        let head = AddressBlock {
            addr: self.addr,
            prefix,
        };
        let remainders = (self.prefix + 1..=prefix)
            .rev()
            .map(|len| AddressBlock {
                addr: Ipv4Addr::from((base + block_size(len)) as u32),
                prefix: len,
            })
            .collect();
        Ok((head, remainders))
    }
}

impl FromStr for AddressBlock {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AddressBlock::new(s)
    }
}

impl Serialize for AddressBlock {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AddressBlock {
    fn deserialize<D>(deserializer: D) -> Result<AddressBlock, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        AddressBlock::new(&s).map_err(de::Error::custom)
    }
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}
