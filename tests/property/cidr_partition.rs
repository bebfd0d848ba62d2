// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for CIDR Partitioning
//!
//! Subdividing a block or descending through it with the splitter must
//! always yield an exact partition of the block: everything inside it,
//! nothing overlapping, no address lost.

use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use subnet_allocator::allocation::{select_candidate, split};
use subnet_allocator::domain::invariants::{validate_conservation, validate_disjoint};
use subnet_allocator::domain::CidrBlock;

// ============================================================================
// Strategies
// ============================================================================

fn v4_block(bits: u32, prefix: u8) -> CidrBlock {
    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    CidrBlock::from_parts(IpAddr::V4(Ipv4Addr::from(bits & mask)), prefix).unwrap()
}

fn v6_block(bits: u128, prefix: u8) -> CidrBlock {
    let mask = if prefix == 0 { 0 } else { u128::MAX << (128 - prefix) };
    CidrBlock::from_parts(IpAddr::V6(Ipv6Addr::from(bits & mask)), prefix).unwrap()
}

/// IPv4 block plus a target at most 10 levels deeper
fn v4_block_and_target() -> impl Strategy<Value = (CidrBlock, u8)> {
    (any::<u32>(), 0u8..=32, 0u8..=10).prop_map(|(bits, prefix, depth)| {
        let block = v4_block(bits, prefix);
        (block, (prefix + depth).min(32))
    })
}

/// IPv6 block plus a target at most 10 levels deeper
fn v6_block_and_target() -> impl Strategy<Value = (CidrBlock, u8)> {
    (any::<u128>(), 1u8..=128, 0u8..=10).prop_map(|(bits, prefix, depth)| {
        let block = v6_block(bits, prefix);
        (block, (prefix + depth).min(128))
    })
}

fn any_block_and_target() -> impl Strategy<Value = (CidrBlock, u8)> {
    prop_oneof![v4_block_and_target(), v6_block_and_target()]
}

// ============================================================================
// Partition law
// ============================================================================

proptest! {
    /// subdivide(B, p) yields 2^(p - B.prefix) disjoint children covering B
    #[test]
    fn prop_subdivide_partitions_block((block, target) in any_block_and_target()) {
        let children = block.subdivide(target).unwrap();

        prop_assert_eq!(children.len(), 1usize << (target - block.prefix_len()));
        prop_assert!(children.iter().all(|c| c.prefix_len() == target));
        prop_assert!(validate_conservation(&block, &children).is_ok());

        // Ascending base addresses, first child shares the block's base
        prop_assert!(children.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(children[0].network(), block.network());
    }

    /// Subdividing shallower than the block's own prefix is rejected
    #[test]
    fn prop_subdivide_rejects_shallower_target(bits in any::<u32>(), prefix in 1u8..=32) {
        let block = v4_block(bits, prefix);
        prop_assert!(block.subdivide(prefix - 1).is_err());
    }
}

// ============================================================================
// Splitter conservation
// ============================================================================

proptest! {
    /// {leaf} ∪ siblings exactly partitions the source block
    #[test]
    fn prop_split_conserves_block((block, target) in any_block_and_target()) {
        let descent = split(&block, target).unwrap();
        let parts: Vec<CidrBlock> = descent.blocks().copied().collect();

        prop_assert!(validate_conservation(&block, &parts).is_ok());
        prop_assert_eq!(descent.leaf.prefix_len(), target);
        prop_assert_eq!(descent.leaf.network(), block.network());
        prop_assert_eq!(descent.siblings.len(), usize::from(target - block.prefix_len()));
    }

    /// Siblings come out largest first, one per level
    #[test]
    fn prop_split_siblings_descend_one_level_each((block, target) in any_block_and_target()) {
        let descent = split(&block, target).unwrap();

        for (level, sibling) in descent.siblings.iter().enumerate() {
            prop_assert_eq!(usize::from(sibling.prefix_len()), usize::from(block.prefix_len()) + level + 1);
        }
    }
}

// ============================================================================
// Selector
// ============================================================================

proptest! {
    /// The chosen block can supply the prefix, and no qualifying block is tighter
    #[test]
    fn prop_selector_is_best_fit(
        prefixes in prop::collection::vec(8u8..=28, 1..12),
        required in 8u8..=28,
    ) {
        // Disjoint blocks: one per /8, varying in size
        let available: Vec<CidrBlock> = prefixes
            .iter()
            .enumerate()
            .map(|(i, p)| v4_block((i as u32 + 1) << 24, *p))
            .collect();
        prop_assert!(validate_disjoint(&available).is_ok());

        match select_candidate(&available, required) {
            Some(chosen) => {
                prop_assert!(chosen.prefix_len() <= required);
                prop_assert!(available
                    .iter()
                    .filter(|b| b.prefix_len() <= required)
                    .all(|b| b.prefix_len() <= chosen.prefix_len()));
            }
            None => {
                prop_assert!(available.iter().all(|b| b.prefix_len() > required));
            }
        }
    }
}
