// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pool State and Mutation Journal
//!
//! [`PoolState`] is the content of one class pool. It only changes by
//! applying [`PoolMutation`]s, which is what makes the two stores
//! interchangeable: the in-memory store keeps the folded state, the NATS
//! store keeps the mutations and folds them on read.
//!
//! ```text
//! fold(PoolState::default(), mutations) → PoolState
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::invariants::validate_role;
use crate::domain::{AllocationRecord, AvailableBlock, CidrBlock, NewAllocation, ResourceClass};
use crate::errors::{AllocationError, AllocationResult};

/// A single change to one class pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoolMutation {
    /// Block removed from the available set
    AvailableRemoved { block: CidrBlock },

    /// Block inserted into (or refreshed in) the available set
    AvailableInserted {
        block: CidrBlock,
        parent: Option<CidrBlock>,
        at: DateTime<Utc>,
    },

    /// Allocation record created
    Allocated { record: AllocationRecord },
}

/// Content of one class pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolState {
    available: BTreeMap<CidrBlock, AvailableBlock>,
    allocated: Vec<AllocationRecord>,
}

impl PoolState {
    /// Rebuild a state by applying mutations in order
    pub fn from_mutations<'a, I>(class: ResourceClass, mutations: I) -> AllocationResult<Self>
    where
        I: IntoIterator<Item = &'a PoolMutation>,
    {
        let mut state = Self::default();
        for mutation in mutations {
            state.apply(class, mutation)?;
        }
        Ok(state)
    }

    /// Apply one mutation
    ///
    /// Removing an absent block fails with `NotFound`. Inserting a block
    /// that is already available only refreshes its timestamp.
    pub fn apply(&mut self, class: ResourceClass, mutation: &PoolMutation) -> AllocationResult<()> {
        match mutation {
            PoolMutation::AvailableRemoved { block } => {
                self.available
                    .remove(block)
                    .ok_or(AllocationError::NotFound {
                        class,
                        block: *block,
                    })?;
            }
            PoolMutation::AvailableInserted { block, parent, at } => {
                self.available
                    .entry(*block)
                    .and_modify(|existing| existing.modified_at = *at)
                    .or_insert_with(|| AvailableBlock {
                        block: *block,
                        parent: *parent,
                        modified_at: *at,
                    });
            }
            PoolMutation::Allocated { record } => {
                self.allocated.push(record.clone());
            }
        }
        Ok(())
    }

    /// Available blocks in ascending address order
    pub fn available(&self) -> impl Iterator<Item = &AvailableBlock> {
        self.available.values()
    }

    /// Available blocks only, in ascending address order
    pub fn available_blocks(&self) -> Vec<CidrBlock> {
        self.available.keys().copied().collect()
    }

    /// Allocation records in creation order
    pub fn allocated(&self) -> &[AllocationRecord] {
        &self.allocated
    }
}

/// Transaction working set shared by the store implementations
///
/// Operations are applied to a private copy of the pool state and recorded
/// in a journal; the owning transaction decides whether to publish them.
#[derive(Debug, Clone)]
pub struct StagedPool {
    class: ResourceClass,
    state: PoolState,
    journal: Vec<PoolMutation>,
}

impl StagedPool {
    pub fn new(class: ResourceClass, state: PoolState) -> Self {
        Self {
            class,
            state,
            journal: Vec::new(),
        }
    }

    pub fn class(&self) -> ResourceClass {
        self.class
    }

    /// State including staged mutations
    pub fn state(&self) -> &PoolState {
        &self.state
    }

    /// Mutations staged so far
    pub fn journal(&self) -> &[PoolMutation] {
        &self.journal
    }

    pub fn into_parts(self) -> (PoolState, Vec<PoolMutation>) {
        (self.state, self.journal)
    }

    fn stage(&mut self, mutation: PoolMutation) -> AllocationResult<()> {
        self.state.apply(self.class, &mutation)?;
        self.journal.push(mutation);
        Ok(())
    }

    pub fn list_available(&self) -> Vec<AvailableBlock> {
        self.state.available().cloned().collect()
    }

    pub fn list_allocated(&self) -> Vec<AllocationRecord> {
        self.state.allocated().to_vec()
    }

    pub fn remove_available(&mut self, block: &CidrBlock) -> AllocationResult<()> {
        self.stage(PoolMutation::AvailableRemoved { block: *block })
    }

    pub fn insert_available(
        &mut self,
        block: CidrBlock,
        parent: Option<CidrBlock>,
    ) -> AllocationResult<()> {
        self.stage(PoolMutation::AvailableInserted {
            block,
            parent,
            at: Utc::now(),
        })
    }

    /// Record an allocation
    ///
    /// # Errors
    /// - `InvalidRequest` if the role does not belong to this pool's class
    pub fn insert_allocated(&mut self, allocation: NewAllocation) -> AllocationResult<AllocationRecord> {
        validate_role(self.class, allocation.role)?;
        let record = allocation.into_record(self.class, Utc::now());
        self.stage(PoolMutation::Allocated {
            record: record.clone(),
        })?;
        Ok(record)
    }
}

/// One committed transaction as persisted by journal-based stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolCommit {
    /// Unique commit ID (UUID v7 for time-ordering)
    pub commit_id: Uuid,
    pub class: ResourceClass,
    pub committed_at: DateTime<Utc>,
    pub mutations: Vec<PoolMutation>,
}

impl PoolCommit {
    pub fn new(class: ResourceClass, mutations: Vec<PoolMutation>) -> Self {
        Self {
            commit_id: Uuid::now_v7(),
            class,
            committed_at: Utc::now(),
            mutations,
        }
    }
}
