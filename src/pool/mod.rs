// Copyright (c) 2025 - Cowboy AI, Inc.
//! Address Pool Store Abstraction
//!
//! This module defines the storage contract the allocation engine needs,
//! and two implementations of it.
//!
//! # Architecture
//!
//! ```text
//! SubnetAllocator ──begin(class)──► PoolTransaction
//!                                    │ list_available
//!                                    │ remove_available
//!                                    │ insert_available
//!                                    │ insert_allocated
//!                                    ▼
//!                               commit / rollback
//! ```
//!
//! # Store Requirements
//!
//! 1. **Isolation**: the snapshot read and the commit of one transaction
//!    are serializable with respect to other transactions on the same class
//! 2. **Atomicity**: a transaction's mutations become visible all at once
//!    or not at all
//! 3. **Independence**: transactions on different classes never wait on
//!    each other
//! 4. **Release**: dropping a transaction without committing rolls it back

use async_trait::async_trait;

use crate::domain::{AllocationRecord, AvailableBlock, CidrBlock, NewAllocation, ResourceClass};
use crate::errors::AllocationResult;

pub mod memory;
pub mod nats;
pub mod state;

pub use memory::{InMemoryPoolStore, InMemoryTransaction};
pub use nats::{NatsPoolStore, NatsTransaction};
pub use state::{PoolCommit, PoolMutation, PoolState, StagedPool};

/// Store of the per-class address pools
#[async_trait]
pub trait AddressPoolStore: Send + Sync {
    /// Transaction type scoped to one class
    type Transaction: PoolTransaction;

    /// Open a transaction on `class`
    ///
    /// The transaction observes a consistent snapshot of the class pool for
    /// its whole lifetime.
    async fn begin(&self, class: ResourceClass) -> AllocationResult<Self::Transaction>;
}

/// One all-or-nothing unit of work on a single class pool
#[async_trait]
pub trait PoolTransaction: Send {
    /// Class this transaction is scoped to
    fn class(&self) -> ResourceClass;

    /// Available blocks, including this transaction's own changes
    async fn list_available(&mut self) -> AllocationResult<Vec<AvailableBlock>>;

    /// Allocation records, including this transaction's own changes
    async fn list_allocated(&mut self) -> AllocationResult<Vec<AllocationRecord>>;

    /// Remove a block from the available set
    ///
    /// # Errors
    /// - `NotFound` if the block is not currently available
    async fn remove_available(&mut self, block: &CidrBlock) -> AllocationResult<()>;

    /// Insert a block into the available set
    ///
    /// Inserting a block that is already available refreshes its
    /// modification time and changes nothing else.
    async fn insert_available(
        &mut self,
        block: CidrBlock,
        parent: Option<CidrBlock>,
    ) -> AllocationResult<()>;

    /// Record an allocation
    async fn insert_allocated(&mut self, allocation: NewAllocation)
        -> AllocationResult<AllocationRecord>;

    /// First available or allocated block sharing an address with `block`
    async fn find_overlap(&mut self, block: &CidrBlock) -> AllocationResult<Option<CidrBlock>> {
        let available = self.list_available().await?;
        let allocated = self.list_allocated().await?;

        Ok(available
            .iter()
            .map(|entry| entry.block)
            .chain(allocated.iter().map(|record| record.block))
            .find(|existing| existing.overlaps(block)))
    }

    /// Publish every staged change atomically
    ///
    /// # Errors
    /// - `PersistenceFailure` if the changes could not be made durable;
    ///   nothing is visible in that case
    async fn commit(self) -> AllocationResult<()>;

    /// Discard every staged change
    async fn rollback(self) -> AllocationResult<()>;
}
