// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hierarchical Splitter
//!
//! Narrows a block to a target prefix by repeated halving along a single
//! path. At every level the lower half is kept and the upper half is set
//! aside as a sibling, so a descent of `k` levels produces exactly `k`
//! siblings (one per level, largest first) instead of the `2^k` leaves of
//! a full expansion.
//!
//! ```text
//! 10.0.0.0/22 → /24
//!
//! 10.0.0.0/22
//! ├── 10.0.0.0/23
//! │   ├── 10.0.0.0/24   ← leaf
//! │   └── 10.0.1.0/24   ← sibling
//! └── 10.0.2.0/23       ← sibling
//! ```

use crate::domain::{CidrBlock, NetworkError};

/// Result of a single-path descent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Block of the target prefix length (lowest address of the source)
    pub leaf: CidrBlock,

    /// Unchosen halves, one per level, ordered from the largest down
    pub siblings: Vec<CidrBlock>,
}

impl Split {
    /// Leaf followed by every sibling; together they partition the source
    pub fn blocks(&self) -> impl Iterator<Item = &CidrBlock> {
        std::iter::once(&self.leaf).chain(self.siblings.iter())
    }
}

/// Descend from `block` to `target_prefix`
///
/// `target_prefix == block.prefix_len()` is a no-op returning the block
/// itself with no siblings.
///
/// # Errors
/// - `PrefixNotDeeper` if `target_prefix` is shorter than the block's prefix
/// - `InvalidPrefixLength` if `target_prefix` exceeds the family width
pub fn split(block: &CidrBlock, target_prefix: u8) -> Result<Split, NetworkError> {
    if target_prefix < block.prefix_len() {
        return Err(NetworkError::PrefixNotDeeper {
            from: block.prefix_len(),
            to: target_prefix,
        });
    }
    if target_prefix > block.max_prefix_len() {
        return Err(NetworkError::InvalidPrefixLength(target_prefix));
    }

    let mut current = *block;
    let mut siblings = Vec::with_capacity(usize::from(target_prefix - block.prefix_len()));

    while current.prefix_len() < target_prefix {
        let Some((lower, upper)) = current.halves() else {
            return Err(NetworkError::InvalidPrefixLength(target_prefix));
        };
        siblings.push(upper);
        current = lower;
    }

    Ok(Split {
        leaf: current,
        siblings,
    })
}
