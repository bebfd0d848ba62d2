// Copyright (c) 2025 - Cowboy AI, Inc.
//! CIDR Block Value Object and Address Arithmetic
//!
//! A [`CidrBlock`] is an immutable (base address, prefix length) pair for
//! either address family. All arithmetic is done on the address as a
//! `u128` so IPv4 and IPv6 share one code path; the family only decides
//! the address width (32 or 128 bits).
//!
//! Invariants:
//! - Prefix length is within the family width
//! - Host bits of the base address are zero (canonical network address)
//! - Blocks of different families never contain or overlap each other

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

/// CIDR validation and arithmetic error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4, 0-128 for IPv6)")]
    InvalidPrefixLength(u8),

    #[error("{0} has host bits set")]
    HostBitsSet(String),

    #[error("Cannot narrow /{from} to /{to}: target must not be shorter than the source")]
    PrefixNotDeeper { from: u8, to: u8 },
}

/// Address family of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Number of bits in an address of this family
    pub fn width(&self) -> u8 {
        match self {
            Self::Ipv4 => 32,
            Self::Ipv6 => 128,
        }
    }
}

/// An address network: base address plus prefix length
///
/// Ordering is by family, then base address, then prefix length, so a
/// sorted sequence of disjoint blocks is in ascending address order.
///
/// # Examples
///
/// ```rust
/// use subnet_allocator::domain::CidrBlock;
///
/// let block: CidrBlock = "10.0.0.0/16".parse().unwrap();
/// assert_eq!(block.prefix_len(), 16);
/// assert_eq!(block.capacity(), 65_536);
///
/// let quarters = block.subdivide(18).unwrap();
/// assert_eq!(quarters.len(), 4);
/// assert_eq!(quarters[1].to_string(), "10.0.64.0/18");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CidrBlock {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrBlock {
    /// Parse strict CIDR notation (e.g. `"10.0.0.0/16"`)
    ///
    /// # Invariants
    /// - Prefix is mandatory
    /// - Prefix length 0-32 for IPv4, 0-128 for IPv6
    /// - No host bits set in the address
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref().trim();

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(cidr.to_string()))?;

        let network = IpAddr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_len = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        Self::from_parts(network, prefix_len)
    }

    /// Create from a network address and prefix length
    pub fn from_parts(network: IpAddr, prefix_len: u8) -> Result<Self, NetworkError> {
        let family = family_of(&network);
        if prefix_len > family.width() {
            return Err(NetworkError::InvalidPrefixLength(prefix_len));
        }

        let bits = to_bits(&network);
        if bits & host_mask(family.width(), prefix_len) != 0 {
            return Err(NetworkError::HostBitsSet(format!("{}/{}", network, prefix_len)));
        }

        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// Build from raw bits already known to be aligned to `prefix_len`
    fn from_bits(family: AddressFamily, bits: u128, prefix_len: u8) -> Self {
        Self {
            network: from_bits(family, bits),
            prefix_len,
        }
    }

    /// Base (network) address
    pub fn network(&self) -> IpAddr {
        self.network
    }

    /// Prefix length
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Address family
    pub fn family(&self) -> AddressFamily {
        family_of(&self.network)
    }

    /// Longest prefix this family allows (32 or 128)
    pub fn max_prefix_len(&self) -> u8 {
        self.family().width()
    }

    pub fn is_ipv4(&self) -> bool {
        self.network.is_ipv4()
    }

    pub fn is_ipv6(&self) -> bool {
        self.network.is_ipv6()
    }

    /// Number of host bits (address width minus prefix length)
    pub fn host_bits(&self) -> u8 {
        self.max_prefix_len() - self.prefix_len
    }

    /// Number of addresses in the block
    ///
    /// `::/0` holds 2^128 addresses, one more than `u128` can represent;
    /// that single block saturates at `u128::MAX`.
    pub fn capacity(&self) -> u128 {
        match self.host_bits() {
            128 => u128::MAX,
            bits => 1u128 << bits,
        }
    }

    /// Last address in the block
    pub fn last_address(&self) -> IpAddr {
        from_bits(self.family(), self.last_bits())
    }

    fn first_bits(&self) -> u128 {
        to_bits(&self.network)
    }

    fn last_bits(&self) -> u128 {
        self.first_bits() | host_mask(self.max_prefix_len(), self.prefix_len)
    }

    /// True iff `other`'s whole address range lies inside this block
    ///
    /// Blocks of different families are never comparable and never
    /// contain each other.
    pub fn contains(&self, other: &CidrBlock) -> bool {
        if self.family() != other.family() || self.prefix_len > other.prefix_len {
            return false;
        }

        let mask = !host_mask(self.max_prefix_len(), self.prefix_len);
        other.first_bits() & mask == self.first_bits()
    }

    /// True iff the two blocks share at least one address
    pub fn overlaps(&self, other: &CidrBlock) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// The enclosing block one bit shorter, or `None` for a /0
    pub fn supernet(&self) -> Option<CidrBlock> {
        let prefix_len = self.prefix_len.checked_sub(1)?;
        let mask = !host_mask(self.max_prefix_len(), prefix_len);
        Some(Self::from_bits(self.family(), self.first_bits() & mask, prefix_len))
    }

    /// Split into the lower and upper half, or `None` for a host block
    pub fn halves(&self) -> Option<(CidrBlock, CidrBlock)> {
        if self.prefix_len >= self.max_prefix_len() {
            return None;
        }

        let child_prefix = self.prefix_len + 1;
        let child_size = 1u128 << (self.max_prefix_len() - child_prefix);
        let family = self.family();

        Some((
            Self::from_bits(family, self.first_bits(), child_prefix),
            Self::from_bits(family, self.first_bits() + child_size, child_prefix),
        ))
    }

    /// Lazily enumerate the children of length `new_prefix`, lowest first
    pub fn subnets(&self, new_prefix: u8) -> Result<Subnets, NetworkError> {
        if new_prefix > self.max_prefix_len() {
            return Err(NetworkError::InvalidPrefixLength(new_prefix));
        }
        if new_prefix < self.prefix_len {
            return Err(NetworkError::PrefixNotDeeper {
                from: self.prefix_len,
                to: new_prefix,
            });
        }

        Ok(Subnets {
            family: self.family(),
            prefix_len: new_prefix,
            step_bits: self.max_prefix_len() - new_prefix,
            next: Some(self.first_bits()),
            last: self.last_bits(),
        })
    }

    /// Split into exactly `2^(new_prefix - prefix_len)` equal children
    ///
    /// The children cover this block with no gaps or overlaps and are
    /// ordered by ascending base address. This materialises every child;
    /// use [`CidrBlock::subnets`] to walk large expansions lazily.
    pub fn subdivide(&self, new_prefix: u8) -> Result<Vec<CidrBlock>, NetworkError> {
        Ok(self.subnets(new_prefix)?.collect())
    }

    /// Canonical `address/prefix` string
    pub fn as_cidr(&self) -> String {
        format!("{}/{}", self.network, self.prefix_len)
    }
}

/// Iterator over equal-sized children of a block
#[derive(Debug, Clone)]
pub struct Subnets {
    family: AddressFamily,
    prefix_len: u8,
    step_bits: u8,
    next: Option<u128>,
    last: u128,
}

impl Iterator for Subnets {
    type Item = CidrBlock;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        if current > self.last {
            self.next = None;
            return None;
        }

        // The step overflows exactly when `current` is the final child.
        self.next = match self.step_bits {
            128 => None,
            bits => current.checked_add(1u128 << bits),
        };

        Some(CidrBlock::from_bits(self.family, current, self.prefix_len))
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cidr())
    }
}

impl FromStr for CidrBlock {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CidrBlock {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CidrBlock> for String {
    fn from(block: CidrBlock) -> Self {
        block.as_cidr()
    }
}

/// Strict CIDR format check used by input validation
pub fn validate_cidr_format(cidr: &str) -> bool {
    CidrBlock::new(cidr).is_ok()
}

fn family_of(addr: &IpAddr) -> AddressFamily {
    match addr {
        IpAddr::V4(_) => AddressFamily::Ipv4,
        IpAddr::V6(_) => AddressFamily::Ipv6,
    }
}

fn to_bits(addr: &IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u128::from(u32::from(*v4)),
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

fn from_bits(family: AddressFamily, bits: u128) -> IpAddr {
    match family {
        // Callers only pass values derived from a 32-bit address.
        AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::from(bits as u32)),
        AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::from(bits)),
    }
}

/// Mask selecting the host bits of a `prefix_len` block in a `width`-bit family
fn host_mask(width: u8, prefix_len: u8) -> u128 {
    match width - prefix_len {
        128 => u128::MAX,
        bits => (1u128 << bits) - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn block(s: &str) -> CidrBlock {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_ipv4() {
        let b = block("10.0.0.0/16");
        assert_eq!(b.network().to_string(), "10.0.0.0");
        assert_eq!(b.prefix_len(), 16);
        assert!(b.is_ipv4());
        assert_eq!(b.as_cidr(), "10.0.0.0/16");
    }

    #[test]
    fn test_parse_ipv6() {
        let b = block("2001:db8::/32");
        assert!(b.is_ipv6());
        assert_eq!(b.max_prefix_len(), 128);
        assert_eq!(b.to_string(), "2001:db8::/32");
    }

    #[test_case("10.0.0.1/16" ; "host bits set")]
    #[test_case("10.0.0.0/33" ; "ipv4 prefix too long")]
    #[test_case("2001:db8::/129" ; "ipv6 prefix too long")]
    #[test_case("10.0.0.0" ; "missing prefix")]
    #[test_case("999.0.0.0/8" ; "bad address")]
    #[test_case("10.0.0.0/abc" ; "bad prefix")]
    fn test_rejects_invalid(input: &str) {
        assert!(CidrBlock::new(input).is_err());
        assert!(!validate_cidr_format(input));
    }

    #[test]
    fn test_host_bits_error_kind() {
        assert_eq!(
            CidrBlock::new("192.168.1.10/24"),
            Err(NetworkError::HostBitsSet("192.168.1.10/24".to_string()))
        );
    }

    #[test_case("10.0.0.0/16", 65_536)]
    #[test_case("10.0.0.0/24", 256)]
    #[test_case("10.0.0.1/32", 1)]
    #[test_case("0.0.0.0/0", 1 << 32)]
    #[test_case("2001:db8::/64", 1 << 64)]
    fn test_capacity(input: &str, expected: u128) {
        assert_eq!(block(input).capacity(), expected);
    }

    #[test]
    fn test_capacity_saturates_for_whole_ipv6_space() {
        assert_eq!(block("::/0").capacity(), u128::MAX);
    }

    #[test]
    fn test_contains() {
        let parent = block("10.0.0.0/16");
        assert!(parent.contains(&block("10.0.0.0/16")));
        assert!(parent.contains(&block("10.0.128.0/17")));
        assert!(parent.contains(&block("10.0.255.255/32")));
        assert!(!parent.contains(&block("10.1.0.0/24")));
        assert!(!parent.contains(&block("10.0.0.0/8")));
        assert!(!block("10.0.1.0/24").contains(&parent));
    }

    #[test]
    fn test_contains_across_families_is_false() {
        assert!(!block("0.0.0.0/0").contains(&block("::/128")));
        assert!(!block("::/0").contains(&block("10.0.0.0/8")));
    }

    #[test]
    fn test_overlaps() {
        assert!(block("10.0.0.0/16").overlaps(&block("10.0.5.0/24")));
        assert!(block("10.0.5.0/24").overlaps(&block("10.0.0.0/16")));
        assert!(!block("10.0.0.0/24").overlaps(&block("10.0.1.0/24")));
    }

    #[test]
    fn test_halves_and_supernet() {
        let (lo, hi) = block("10.0.0.0/16").halves().unwrap();
        assert_eq!(lo, block("10.0.0.0/17"));
        assert_eq!(hi, block("10.0.128.0/17"));
        assert_eq!(hi.supernet(), Some(block("10.0.0.0/16")));
        assert_eq!(block("0.0.0.0/0").supernet(), None);
        assert_eq!(block("10.0.0.1/32").halves(), None);
    }

    #[test]
    fn test_last_address() {
        assert_eq!(block("10.0.0.0/24").last_address().to_string(), "10.0.0.255");
        assert_eq!(
            block("::/0").last_address().to_string(),
            "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff"
        );
    }

    #[test]
    fn test_subdivide_ordered_and_covering() {
        let children = block("192.168.0.0/22").subdivide(24).unwrap();
        let rendered: Vec<String> = children.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "192.168.0.0/24",
                "192.168.1.0/24",
                "192.168.2.0/24",
                "192.168.3.0/24",
            ]
        );
    }

    #[test]
    fn test_subdivide_same_prefix_is_identity() {
        let b = block("10.0.0.0/24");
        assert_eq!(b.subdivide(24).unwrap(), vec![b]);
    }

    #[test]
    fn test_subdivide_rejects_shorter_prefix() {
        assert_eq!(
            block("10.0.0.0/24").subdivide(16),
            Err(NetworkError::PrefixNotDeeper { from: 24, to: 16 })
        );
        assert_eq!(
            block("10.0.0.0/24").subdivide(33),
            Err(NetworkError::InvalidPrefixLength(33))
        );
    }

    #[test]
    fn test_subnets_at_top_of_address_space() {
        let children: Vec<_> = block("255.255.255.252/30").subnets(32).unwrap().collect();
        assert_eq!(children.len(), 4);
        assert_eq!(children[3], block("255.255.255.255/32"));

        let top: Vec<_> = block("ffff:ffff:ffff:ffff:ffff:ffff:ffff:fffe/127")
            .subnets(128)
            .unwrap()
            .collect();
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn test_subnets_is_lazy() {
        let first = block("::/0").subnets(128).unwrap().next();
        assert_eq!(first, Some(block("::/128")));
    }

    #[test]
    fn test_ordering_is_by_address() {
        let mut blocks = vec![block("10.1.0.0/16"), block("10.0.0.0/20"), block("10.0.16.0/20")];
        blocks.sort();
        assert_eq!(
            blocks,
            vec![block("10.0.0.0/20"), block("10.0.16.0/20"), block("10.1.0.0/16")]
        );
    }

    #[test]
    fn test_serde_as_string() {
        let b = block("10.0.0.0/16");
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "\"10.0.0.0/16\"");
        let back: CidrBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
        assert!(serde_json::from_str::<CidrBlock>("\"10.0.0.1/16\"").is_err());
    }
}
