// Copyright (c) 2025 - Cowboy AI, Inc.
//! Candidate Selector
//!
//! Picks the block to carve from using best-fit: among blocks that can
//! still supply a `/p` (their prefix is `<= p`), the one with the longest
//! prefix wins, so small requests never eat into large blocks while a
//! tighter block exists. Ties go to the lowest base address.

use std::cmp::Reverse;

use crate::domain::CidrBlock;

/// Whether `block` can supply a sub-block of length `required_prefix`
pub fn can_supply(block: &CidrBlock, required_prefix: u8) -> bool {
    block.prefix_len() <= required_prefix && required_prefix <= block.max_prefix_len()
}

/// Best-fit choice of the block to carve a `/required_prefix` from
///
/// Returns `None` when no block qualifies. The result does not depend on
/// the order of `available`.
pub fn select_candidate<'a, I>(available: I, required_prefix: u8) -> Option<CidrBlock>
where
    I: IntoIterator<Item = &'a CidrBlock>,
{
    available
        .into_iter()
        .filter(|block| can_supply(block, required_prefix))
        .min_by_key(|block| (Reverse(block.prefix_len()), **block))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn blocks(list: &[&str]) -> Vec<CidrBlock> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_prefers_tighter_block() {
        let available = blocks(&["10.1.0.0/16", "10.0.0.0/20"]);
        assert_eq!(
            select_candidate(&available, 24),
            Some("10.0.0.0/20".parse().unwrap())
        );
    }

    #[test_case(&["10.0.0.0/16", "10.1.0.0/24"], 24, Some("10.1.0.0/24") ; "exact fit wins")]
    #[test_case(&["10.2.0.0/20", "10.1.0.0/20"], 24, Some("10.1.0.0/20") ; "tie broken by lowest address")]
    #[test_case(&["10.0.0.0/25", "10.0.1.0/26"], 24, None ; "all blocks too small")]
    #[test_case(&[], 24, None ; "empty pool")]
    #[test_case(&["10.0.0.0/8", "2001:db8::/32"], 48, Some("2001:db8::/32") ; "ipv4 cannot supply beyond /32")]
    #[test_case(&["2001:db8::/16", "10.0.0.0/16"], 24, Some("10.0.0.0/16") ; "cross family tie prefers ipv4")]
    fn test_selection(available: &[&str], prefix: u8, expected: Option<&str>) {
        let available = blocks(available);
        let expected = expected.map(|s| s.parse::<CidrBlock>().unwrap());
        assert_eq!(select_candidate(&available, prefix), expected);
    }

    #[test]
    fn test_independent_of_input_order() {
        let mut available = blocks(&["10.3.0.0/22", "10.0.0.0/16", "10.2.0.0/22", "10.4.0.0/23"]);
        let forward = select_candidate(&available, 24);
        available.reverse();
        assert_eq!(select_candidate(&available, 24), forward);
        assert_eq!(forward, Some("10.4.0.0/23".parse().unwrap()));
    }
}
