// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for subnet-allocator
//!
//! Shared pool setups and a store wrapper that injects commit failures.
//!
//! # Design Principles
//! - Pools are seeded through the same store contract the allocator uses
//! - Identity strings are fixed constants so records compare exactly

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use subnet_allocator::allocation::{KubernetesPrefixes, KubernetesRequest, NormalRequest};
use subnet_allocator::domain::{
    AllocationRecord, AvailableBlock, CidrBlock, NewAllocation, ResourceClass,
};
use subnet_allocator::errors::{AllocationError, AllocationResult};
use subnet_allocator::pool::{AddressPoolStore, InMemoryPoolStore, PoolTransaction};
use subnet_allocator::service::SubnetAllocator;

pub const PROJECT: &str = "proj-ccoe";
pub const HOST_NETWORK: &str = "shared-vpc-prod";
pub const OWNER: &str = "alice@example.com";

/// Parse a CIDR fixture
pub fn block(s: &str) -> CidrBlock {
    s.parse().expect("Invalid CIDR in test fixture")
}

pub fn blocks(list: &[&str]) -> Vec<CidrBlock> {
    list.iter().map(|s| block(s)).collect()
}

pub fn normal_request(prefix: u8) -> NormalRequest {
    NormalRequest::new(PROJECT, HOST_NETWORK, prefix, OWNER)
}

pub fn kubernetes_request(primary: u8, services: u8, pods: u8) -> KubernetesRequest {
    KubernetesRequest::new(
        PROJECT,
        HOST_NETWORK,
        KubernetesPrefixes::new(primary, services, pods),
        OWNER,
    )
}

/// In-memory store with `roots` provisioned into `class`
pub async fn seeded_store(class: ResourceClass, roots: &[&str]) -> InMemoryPoolStore {
    let store = InMemoryPoolStore::new();
    for root in roots {
        store
            .seed(class, block(root))
            .await
            .expect("Failed to seed test pool");
    }
    store
}

pub async fn seeded_allocator(
    class: ResourceClass,
    roots: &[&str],
) -> SubnetAllocator<InMemoryPoolStore> {
    SubnetAllocator::new(seeded_store(class, roots).await)
}

/// Sum of block capacities
pub fn total_capacity<'a>(blocks: impl IntoIterator<Item = &'a CidrBlock>) -> u128 {
    blocks.into_iter().map(|b| b.capacity()).sum()
}

// ============================================================================
// Failure injection
// ============================================================================

/// Store whose next `n` commits fail with `PersistenceFailure`
///
/// A failing commit rolls the inner transaction back first, so the pool is
/// left exactly as a real conflicting commit would leave it.
#[derive(Clone)]
pub struct FlakyStore<S> {
    inner: S,
    failures_left: Arc<AtomicU32>,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S, failing_commits: u32) -> Self {
        Self {
            inner,
            failures_left: Arc::new(AtomicU32::new(failing_commits)),
        }
    }

    pub fn failures_left(&self) -> u32 {
        self.failures_left.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: AddressPoolStore> AddressPoolStore for FlakyStore<S> {
    type Transaction = FlakyTransaction<S::Transaction>;

    async fn begin(&self, class: ResourceClass) -> AllocationResult<Self::Transaction> {
        Ok(FlakyTransaction {
            inner: self.inner.begin(class).await?,
            failures_left: Arc::clone(&self.failures_left),
        })
    }
}

pub struct FlakyTransaction<T> {
    inner: T,
    failures_left: Arc<AtomicU32>,
}

#[async_trait]
impl<T: PoolTransaction> PoolTransaction for FlakyTransaction<T> {
    fn class(&self) -> ResourceClass {
        self.inner.class()
    }

    async fn list_available(&mut self) -> AllocationResult<Vec<AvailableBlock>> {
        self.inner.list_available().await
    }

    async fn list_allocated(&mut self) -> AllocationResult<Vec<AllocationRecord>> {
        self.inner.list_allocated().await
    }

    async fn remove_available(&mut self, block: &CidrBlock) -> AllocationResult<()> {
        self.inner.remove_available(block).await
    }

    async fn insert_available(
        &mut self,
        block: CidrBlock,
        parent: Option<CidrBlock>,
    ) -> AllocationResult<()> {
        self.inner.insert_available(block, parent).await
    }

    async fn insert_allocated(
        &mut self,
        allocation: NewAllocation,
    ) -> AllocationResult<AllocationRecord> {
        self.inner.insert_allocated(allocation).await
    }

    async fn commit(self) -> AllocationResult<()> {
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if fail {
            self.inner.rollback().await?;
            return Err(AllocationError::PersistenceFailure(
                "injected commit conflict".to_string(),
            ));
        }
        self.inner.commit().await
    }

    async fn rollback(self) -> AllocationResult<()> {
        self.inner.rollback().await
    }
}
