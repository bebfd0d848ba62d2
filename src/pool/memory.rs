// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Process Pool Store
//!
//! Each class pool sits behind its own async mutex. A transaction holds the
//! class lock from `begin` until it commits, rolls back or is dropped, which
//! serializes allocations on the same class while leaving the other class
//! free. Changes are staged on a copy and swapped in on commit.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::{AllocationRecord, AvailableBlock, CidrBlock, NewAllocation, ResourceClass};
use crate::errors::AllocationResult;
use crate::pool::state::{PoolState, StagedPool};
use crate::pool::{AddressPoolStore, PoolTransaction};

/// Address pools held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryPoolStore {
    normal: Arc<Mutex<PoolState>>,
    kubernetes: Arc<Mutex<PoolState>>,
}

impl InMemoryPoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a root block into a class pool
    ///
    /// Overlap checks belong to the caller; see `SubnetAllocator::provision`.
    pub async fn seed(&self, class: ResourceClass, block: CidrBlock) -> AllocationResult<()> {
        let mut tx = self.begin(class).await?;
        tx.insert_available(block, None).await?;
        tx.commit().await
    }

    fn pool(&self, class: ResourceClass) -> Arc<Mutex<PoolState>> {
        match class {
            ResourceClass::Normal => Arc::clone(&self.normal),
            ResourceClass::Kubernetes => Arc::clone(&self.kubernetes),
        }
    }
}

#[async_trait]
impl AddressPoolStore for InMemoryPoolStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self, class: ResourceClass) -> AllocationResult<Self::Transaction> {
        let guard = self.pool(class).lock_owned().await;
        let staged = StagedPool::new(class, (*guard).clone());
        debug!(class = %class, "opened in-memory pool transaction");
        Ok(InMemoryTransaction { guard, staged })
    }
}

/// Transaction holding the class lock
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<PoolState>,
    staged: StagedPool,
}

#[async_trait]
impl PoolTransaction for InMemoryTransaction {
    fn class(&self) -> ResourceClass {
        self.staged.class()
    }

    async fn list_available(&mut self) -> AllocationResult<Vec<AvailableBlock>> {
        Ok(self.staged.list_available())
    }

    async fn list_allocated(&mut self) -> AllocationResult<Vec<AllocationRecord>> {
        Ok(self.staged.list_allocated())
    }

    async fn remove_available(&mut self, block: &CidrBlock) -> AllocationResult<()> {
        self.staged.remove_available(block)
    }

    async fn insert_available(
        &mut self,
        block: CidrBlock,
        parent: Option<CidrBlock>,
    ) -> AllocationResult<()> {
        self.staged.insert_available(block, parent)
    }

    async fn insert_allocated(
        &mut self,
        allocation: NewAllocation,
    ) -> AllocationResult<AllocationRecord> {
        self.staged.insert_allocated(allocation)
    }

    async fn commit(self) -> AllocationResult<()> {
        let Self { mut guard, staged } = self;
        let class = staged.class();
        let (state, journal) = staged.into_parts();
        *guard = state;
        debug!(class = %class, mutations = journal.len(), "committed in-memory pool transaction");
        Ok(())
    }

    async fn rollback(self) -> AllocationResult<()> {
        debug!(
            class = %self.staged.class(),
            discarded = self.staged.journal().len(),
            "rolled back in-memory pool transaction"
        );
        Ok(())
    }
}
