// Copyright (c) 2025 - Cowboy AI, Inc.
//! CIDR Allocation Engine
//!
//! Pure planning for both allocation variants. A planner takes a snapshot
//! of the available blocks of one class and a request, and returns the
//! complete set of pool changes the request implies, or a typed error.
//! Planners perform no I/O; the service layer applies their output inside
//! one store transaction.
//!
//! # Planning Pattern
//!
//! ```text
//! plan(Snapshot, Request) → Result<Plan, AllocationError>
//!
//! Snapshot ──► Candidate Selector ──► parent
//!                                       │
//!                                       ▼
//!                          Hierarchical Splitter (× roles)
//!                                       │
//!                                       ▼
//!                       leaf block(s) + sibling blocks
//!                                       │
//!                                       ▼
//!                            invariant re-verification
//! ```
//!
//! The resulting [`PoolChanges`] always consume exactly one available
//! block and partition it into allocated and released blocks.

pub mod kubernetes;
pub mod normal;
pub mod selector;
pub mod splitter;

pub use kubernetes::{
    plan_kubernetes, KubernetesAllocation, KubernetesPlan, KubernetesPrefixes, KubernetesRequest,
};
pub use normal::{plan_normal, NormalAllocation, NormalPlan, NormalRequest};
pub use selector::{can_supply, select_candidate};
pub use splitter::{split, Split};

use crate::domain::{AllocationRole, CidrBlock, ResourceClass};
use crate::errors::{AllocationError, AllocationResult};

/// One block to record as allocated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAllocation {
    pub block: CidrBlock,
    pub role: AllocationRole,
    pub parent: Option<CidrBlock>,
}

/// Every pool mutation a single allocation implies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolChanges {
    pub class: ResourceClass,

    /// Available block removed from the pool
    pub consumed: CidrBlock,

    /// Blocks to record as allocated, in role order
    pub allocations: Vec<PlannedAllocation>,

    /// Sibling blocks returned to the pool
    pub released: Vec<CidrBlock>,
}

/// Validate a requested prefix length
///
/// Zero is rejected: a /0 request would consume an entire family.
/// Lengths beyond 128 cannot exist in either family.
pub(crate) fn validate_requested_prefix(role: &str, prefix: u8) -> AllocationResult<()> {
    if prefix == 0 || prefix > 128 {
        return Err(AllocationError::InvalidPrefix(format!(
            "{} prefix /{} must be between /1 and /128",
            role, prefix
        )));
    }
    Ok(())
}
