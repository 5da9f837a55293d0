//! Free-space tree over one network block.
//!
//! Free blocks are kept as disjoint leaves ordered by base address. Extraction
//! splits a free block and re-inserts the remainders; space is never merged
//! back, so one tree serves exactly one topology build.

use crate::error::TopologyError;
use crate::models::{clamp_prefix, AddressBlock};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeSpaceTree {
    free: BTreeSet<AddressBlock>,
}

impl FreeSpaceTree {
    /// Seed the tree with the whole network block.
    pub fn new(total: AddressBlock) -> Self {
        let mut free = BTreeSet::new();
        free.insert(total);
        FreeSpaceTree { free }
    }

    /// Take a block of the requested prefix length.
    ///
    /// Prefix lengths above /28 are clamped to /28. The first free block in
    /// address order that is large enough is used; when it is larger than
    /// needed, its lowest addresses are returned and the rest goes back into
    /// the tree.
    pub fn extract(&mut self, prefix: u8) -> Result<AddressBlock, TopologyError> {
        let prefix = clamp_prefix(prefix);

        let target = self
            .free
            .iter()
            .find(|b| b.prefix() <= prefix)
            .copied()
            .ok_or(TopologyError::OutOfSpace { prefix })?;

        self.free.remove(&target);

        if target.prefix() == prefix {
            log::debug!("extract /{prefix}: exact fit {target}");
            return Ok(target);
        }

        let (block, remainders) = target.split(prefix)?;
        log::debug!(
            "extract /{prefix}: {block} from {target}, {} remainder block(s)",
            remainders.len()
        );
        self.free.extend(remainders);
        Ok(block)
    }

    /// Addresses not handed out yet.
    pub fn free_size(&self) -> u64 {
        self.free.iter().map(|b| b.size()).sum()
    }

    /// Free blocks in address order.
    pub fn free_blocks(&self) -> impl Iterator<Item = &AddressBlock> {
        self.free.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(s: &str) -> AddressBlock {
        AddressBlock::new(s).unwrap()
    }

    #[test]
    fn test_extract_exact_fit() {
        let mut tree = FreeSpaceTree::new(block("10.0.0.0/24"));
        assert_eq!(tree.extract(24).unwrap(), block("10.0.0.0/24"));
        assert_eq!(tree.free_size(), 0);
        assert_eq!(
            tree.extract(24).unwrap_err(),
            TopologyError::OutOfSpace { prefix: 24 }
        );
    }

    #[test]
    fn test_extract_splits_from_lowest_addresses() {
        let mut tree = FreeSpaceTree::new(block("10.0.0.0/16"));
        assert_eq!(tree.extract(24).unwrap(), block("10.0.0.0/24"));
        assert_eq!(tree.extract(24).unwrap(), block("10.0.1.0/24"));
        assert_eq!(tree.extract(24).unwrap(), block("10.0.2.0/24"));
        let free: Vec<String> = tree.free_blocks().map(|b| b.to_string()).collect();
        assert_eq!(
            free,
            vec![
                "10.0.3.0/24",
                "10.0.4.0/22",
                "10.0.8.0/21",
                "10.0.16.0/20",
                "10.0.32.0/19",
                "10.0.64.0/18",
                "10.0.128.0/17",
            ]
        );
    }

    #[test]
    fn test_extract_clamps_to_smallest_subnet() {
        let mut tree = FreeSpaceTree::new(block("10.0.0.0/24"));
        let b = tree.extract(30).unwrap();
        assert_eq!(b, block("10.0.0.0/28"));
        assert_eq!(b.prefix(), 28);
    }

    #[test]
    fn test_free_space_accounting() {
        let total = block("172.16.0.0/20");
        let mut tree = FreeSpaceTree::new(total);
        let mut taken = 0;
        for prefix in [24, 28, 26, 22, 28, 25] {
            let b = tree.extract(prefix).unwrap();
            assert_eq!(b.prefix(), prefix);
            taken += b.size();
            assert_eq!(tree.free_size(), total.size() - taken);
        }
    }

    #[test]
    fn test_extracted_blocks_never_intersect() {
        let total = block("10.10.0.0/22");
        let mut tree = FreeSpaceTree::new(total);
        let mut taken: Vec<AddressBlock> = Vec::new();
        loop {
            match tree.extract(26) {
                Ok(b) => {
                    assert!(total.contains(b.first()) && total.contains(b.last()));
                    assert!(taken.iter().all(|t| !t.intersects(&b)), "{b} overlaps");
                    taken.push(b);
                }
                Err(e) => {
                    assert_eq!(e, TopologyError::OutOfSpace { prefix: 26 });
                    break;
                }
            }
        }
        assert_eq!(taken.len(), 16);
        assert_eq!(tree.free_size(), 0);
    }

    #[test]
    fn test_larger_request_after_small_ones() {
        let mut tree = FreeSpaceTree::new(block("10.0.0.0/24"));
        assert_eq!(tree.extract(28).unwrap(), block("10.0.0.0/28"));
        assert_eq!(tree.extract(25).unwrap(), block("10.0.0.128/25"));
        assert_eq!(tree.extract(26).unwrap(), block("10.0.0.64/26"));
        assert!(tree.extract(26).is_err());
        assert_eq!(tree.extract(27).unwrap(), block("10.0.0.32/27"));
    }

    #[test]
    fn test_same_requests_same_result() {
        let run = || {
            let mut tree = FreeSpaceTree::new(block("10.0.0.0/16"));
            [28, 24, 24, 20, 28]
                .iter()
                .map(|p| tree.extract(*p).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
