// Copyright (c) 2025 - Cowboy AI, Inc.
//! Normal Allocation Planning
//!
//! A normal request claims one subnet of a required prefix length:
//!
//! 1. Best-fit parent from the `normal` snapshot
//! 2. Parent already of the required length → it is the leaf (no split)
//! 3. Otherwise single-path descent to the leaf, collecting siblings
//! 4. Parent removed, leaf recorded as `subnet`, siblings released

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::allocation::{
    select_candidate, split, validate_requested_prefix, PlannedAllocation, PoolChanges,
};
use crate::domain::invariants::{validate_conservation, validate_non_empty};
use crate::domain::{AllocationRole, CidrBlock, ResourceClass};
use crate::errors::{AllocationError, AllocationResult};

/// Request for one normal subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalRequest {
    pub project: String,
    pub host_network: String,
    pub required_prefix: u8,
    pub owner: String,
}

impl NormalRequest {
    pub fn new(
        project: impl Into<String>,
        host_network: impl Into<String>,
        required_prefix: u8,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            host_network: host_network.into(),
            required_prefix,
            owner: owner.into(),
        }
    }

    /// Validate request fields before touching the pool
    pub fn validate(&self) -> AllocationResult<()> {
        validate_non_empty("project", &self.project)?;
        validate_non_empty("host network", &self.host_network)?;
        validate_non_empty("owner", &self.owner)?;
        validate_requested_prefix("required", self.required_prefix)
    }
}

/// Planned outcome of a normal request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalPlan {
    /// Available block the subnet is carved from
    pub parent: CidrBlock,
    /// Allocated subnet
    pub leaf: CidrBlock,
    /// Blocks returned to the pool
    pub siblings: Vec<CidrBlock>,
}

impl NormalPlan {
    /// Pool mutations this plan implies
    pub fn changes(&self) -> PoolChanges {
        PoolChanges {
            class: ResourceClass::Normal,
            consumed: self.parent,
            allocations: vec![PlannedAllocation {
                block: self.leaf,
                role: AllocationRole::Subnet,
                parent: Some(self.parent),
            }],
            released: self.siblings.clone(),
        }
    }
}

/// Plan a normal allocation against a snapshot of available blocks
pub fn plan_normal(available: &[CidrBlock], request: &NormalRequest) -> AllocationResult<NormalPlan> {
    request.validate()?;

    let parent = select_candidate(available, request.required_prefix).ok_or(
        AllocationError::NoAvailableBlock {
            class: ResourceClass::Normal,
            prefix: request.required_prefix,
        },
    )?;

    let descent = split(&parent, request.required_prefix)?;

    let parts: Vec<CidrBlock> = descent.blocks().copied().collect();
    validate_conservation(&parent, &parts)?;

    Ok(NormalPlan {
        parent,
        leaf: descent.leaf,
        siblings: descent.siblings,
    })
}

/// Committed result of a normal allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalAllocation {
    pub record_id: Uuid,
    pub project: String,
    pub host_network: String,
    pub allocated: CidrBlock,
    pub parent: CidrBlock,
    pub remaining_siblings: Vec<CidrBlock>,
}
