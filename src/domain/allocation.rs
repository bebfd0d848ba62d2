// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pool Entries: Available Blocks and Allocation Records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AllocationRole, CidrBlock, ResourceClass};

/// A block currently free for allocation in one class pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableBlock {
    pub block: CidrBlock,

    /// Block this one was split from; `None` for provisioned roots
    pub parent: Option<CidrBlock>,

    /// Last insert or refresh time
    pub modified_at: DateTime<Utc>,
}

/// Durable claim of one block by a project/host-network/role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    /// Record ID (UUID v7 for time-ordering)
    pub id: Uuid,
    pub class: ResourceClass,
    pub project: String,
    pub host_network: String,
    pub block: CidrBlock,
    pub role: AllocationRole,
    pub created_by: String,
    pub parent: Option<CidrBlock>,
    pub created_at: DateTime<Utc>,
}

/// Fields the orchestrators supply for a new allocation record
///
/// The store assigns the record ID and creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAllocation {
    pub project: String,
    pub host_network: String,
    pub block: CidrBlock,
    pub role: AllocationRole,
    pub owner: String,
    pub parent: Option<CidrBlock>,
}

impl NewAllocation {
    /// Materialise the record for `class` at `created_at`
    pub fn into_record(self, class: ResourceClass, created_at: DateTime<Utc>) -> AllocationRecord {
        AllocationRecord {
            id: Uuid::now_v7(),
            class,
            project: self.project,
            host_network: self.host_network,
            block: self.block,
            role: self.role,
            created_by: self.owner,
            parent: self.parent,
            created_at,
        }
    }
}
