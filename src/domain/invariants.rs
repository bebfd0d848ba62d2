// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Pool Invariants
//!
//! Business rules that every pool state and every allocation must satisfy.
//! All functions are pure (no side effects) and return detailed validation
//! results.
//!
//! # Invariant Categories
//!
//! 1. **Structural Invariants**: request fields are present
//! 2. **Pool Invariants**: available blocks never overlap
//! 3. **Conservation**: available plus allocated space equals the root
//! 4. **Hierarchy**: Kubernetes services and pods sit disjointly inside primary

use crate::domain::{AllocationRole, CidrBlock, ResourceClass};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required request field is empty
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    /// Two blocks that must be disjoint share addresses
    #[error("{first} overlaps {second}")]
    Overlap { first: CidrBlock, second: CidrBlock },

    /// A block escapes the block that must enclose it
    #[error("{child} is not contained in {parent}")]
    NotContained { parent: CidrBlock, child: CidrBlock },

    /// Accounted space does not add up to the root
    #[error("Capacity of {root} is {expected} addresses, but {actual} are accounted for")]
    CapacityMismatch {
        root: CidrBlock,
        expected: u128,
        actual: u128,
    },

    /// Role tag not valid for the pool class
    #[error("Role {role} is not valid for the {class} pool")]
    RoleClassMismatch {
        role: AllocationRole,
        class: ResourceClass,
    },
}

/// Validate a caller-supplied identity field (project, host network, owner)
pub fn validate_non_empty(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

/// Validate a role tag against its pool class
pub fn validate_role(class: ResourceClass, role: AllocationRole) -> ValidationResult {
    if !class.roles().contains(&role) {
        return Err(ValidationError::RoleClassMismatch { role, class });
    }
    Ok(())
}

/// Validate that no two blocks share an address
///
/// Sorting puts every block directly after the block it would overlap, so
/// checking neighbours is sufficient.
///
/// # Rules
/// - Blocks may not overlap, and a block may not contain another
/// - Blocks of different families never conflict
pub fn validate_disjoint(blocks: &[CidrBlock]) -> ValidationResult {
    let mut sorted = blocks.to_vec();
    sorted.sort();

    for pair in sorted.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(ValidationError::Overlap {
                first: pair[0],
                second: pair[1],
            });
        }
    }
    Ok(())
}

/// Validate the conservation law for one pool root
///
/// # Rules
/// - Every block lies inside `root`
/// - Blocks are pairwise disjoint
/// - Their capacities add up to the capacity of `root` exactly
pub fn validate_conservation(root: &CidrBlock, blocks: &[CidrBlock]) -> ValidationResult {
    if let Some(stray) = blocks.iter().find(|b| !root.contains(b)) {
        return Err(ValidationError::NotContained {
            parent: *root,
            child: *stray,
        });
    }

    validate_disjoint(blocks)?;

    let actual = blocks
        .iter()
        .fold(AddressCount::default(), |acc, b| acc.add(b));
    if actual != AddressCount::default().add(root) {
        return Err(ValidationError::CapacityMismatch {
            root: *root,
            expected: root.capacity(),
            actual: actual.saturated(),
        });
    }
    Ok(())
}

/// Exact address total; `u128` alone cannot hold 2^128
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct AddressCount {
    high: u32,
    low: u128,
}

impl AddressCount {
    fn add(self, block: &CidrBlock) -> Self {
        if block.host_bits() == 128 {
            return Self {
                high: self.high + 1,
                low: self.low,
            };
        }
        let (low, carry) = self.low.overflowing_add(1u128 << block.host_bits());
        Self {
            high: self.high + u32::from(carry),
            low,
        }
    }

    fn saturated(self) -> u128 {
        if self.high > 0 {
            u128::MAX
        } else {
            self.low
        }
    }
}

/// Validate the Kubernetes range hierarchy
///
/// # Rules
/// - `primary` contains `services`
/// - `primary` contains `pods`
/// - `services` and `pods` share no address
pub fn validate_kubernetes_hierarchy(
    primary: &CidrBlock,
    services: &CidrBlock,
    pods: &CidrBlock,
) -> ValidationResult {
    for child in [services, pods] {
        if !primary.contains(child) {
            return Err(ValidationError::NotContained {
                parent: *primary,
                child: *child,
            });
        }
    }

    if services.overlaps(pods) {
        return Err(ValidationError::Overlap {
            first: *services,
            second: *pods,
        });
    }
    Ok(())
}
