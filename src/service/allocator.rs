// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subnet Allocation Service
//!
//! Runs each allocation as one store transaction around a pure planner.
//!
//! # Transaction Semantics
//!
//! Each service method is a transaction:
//! 1. Begin a transaction on the request's class
//! 2. Snapshot the available blocks
//! 3. Plan the allocation (pure function)
//! 4. Apply the planned changes through the transaction
//! 5. Commit
//!
//! If any step fails, the transaction is rolled back and the error is
//! returned unchanged. Nothing is retried here; callers re-run the whole
//! method when [`AllocationError::is_retryable`] says so.

use tracing::{debug, info, warn};

use crate::allocation::{
    plan_kubernetes, plan_normal, KubernetesAllocation, KubernetesRequest, NormalAllocation,
    NormalRequest, PoolChanges,
};
use crate::domain::{AllocationRecord, AvailableBlock, CidrBlock, NewAllocation, ResourceClass};
use crate::errors::{AllocationError, AllocationResult};
use crate::pool::{AddressPoolStore, PoolTransaction};

/// Who an allocation is recorded for
struct Claimant<'a> {
    project: &'a str,
    host_network: &'a str,
    owner: &'a str,
}

/// Allocation orchestrator over an address pool store
///
/// # Example
///
/// ```rust
/// use subnet_allocator::allocation::NormalRequest;
/// use subnet_allocator::domain::ResourceClass;
/// use subnet_allocator::pool::InMemoryPoolStore;
/// use subnet_allocator::service::SubnetAllocator;
///
/// # tokio_test::block_on(async {
/// let allocator = SubnetAllocator::new(InMemoryPoolStore::new());
/// allocator
///     .provision(ResourceClass::Normal, "10.0.0.0/16".parse().unwrap())
///     .await
///     .unwrap();
///
/// let request = NormalRequest::new("proj-a", "shared-vpc", 24, "alice@example.com");
/// let allocation = allocator.allocate_normal(&request).await.unwrap();
/// assert_eq!(allocation.allocated.to_string(), "10.0.0.0/24");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct SubnetAllocator<S> {
    store: S,
}

impl<S: AddressPoolStore> SubnetAllocator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Allocate one subnet from the `normal` pool
    ///
    /// # Errors
    /// - `InvalidRequest` / `InvalidPrefix` for malformed requests
    /// - `NoAvailableBlock` if no available block is large enough
    /// - `PersistenceFailure` / `NotFound` if the store lost a race (retryable)
    pub async fn allocate_normal(
        &self,
        request: &NormalRequest,
    ) -> AllocationResult<NormalAllocation> {
        request.validate()?;

        let mut tx = self.store.begin(ResourceClass::Normal).await?;
        let result: AllocationResult<NormalAllocation> = async {
            let available = snapshot(&mut tx).await?;
            let plan = plan_normal(&available, request)?;

            let claimant = Claimant {
                project: &request.project,
                host_network: &request.host_network,
                owner: &request.owner,
            };
            let records = apply_changes(&mut tx, &plan.changes(), &claimant).await?;
            let record_id = records
                .first()
                .map(|record| record.id)
                .ok_or_else(|| {
                    AllocationError::HierarchyViolation("normal plan recorded no subnet".into())
                })?;

            Ok(NormalAllocation {
                record_id,
                project: request.project.clone(),
                host_network: request.host_network.clone(),
                allocated: plan.leaf,
                parent: plan.parent,
                remaining_siblings: plan.siblings,
            })
        }
        .await;

        let allocation = finish(tx, result).await?;

        info!(
            project = %allocation.project,
            host_network = %allocation.host_network,
            allocated = %allocation.allocated,
            parent = %allocation.parent,
            siblings = allocation.remaining_siblings.len(),
            "allocated normal subnet"
        );

        Ok(allocation)
    }

    /// Allocate primary, services and pods ranges from the `kubernetes` pool
    ///
    /// Services and pods are disjoint and both contained in primary.
    pub async fn allocate_kubernetes(
        &self,
        request: &KubernetesRequest,
    ) -> AllocationResult<KubernetesAllocation> {
        request.validate()?;

        let mut tx = self.store.begin(ResourceClass::Kubernetes).await?;
        let result: AllocationResult<KubernetesAllocation> = async {
            let available = snapshot(&mut tx).await?;
            let plan = plan_kubernetes(&available, request)?;

            let claimant = Claimant {
                project: &request.project,
                host_network: &request.host_network,
                owner: &request.owner,
            };
            apply_changes(&mut tx, &plan.changes(), &claimant).await?;

            Ok(KubernetesAllocation {
                project: request.project.clone(),
                host_network: request.host_network.clone(),
                parent: plan.parent,
                primary: plan.primary,
                services: plan.services,
                pods: plan.pods,
                released: plan.released(),
            })
        }
        .await;

        let allocation = finish(tx, result).await?;

        info!(
            project = %allocation.project,
            host_network = %allocation.host_network,
            primary = %allocation.primary,
            services = %allocation.services,
            pods = %allocation.pods,
            "allocated kubernetes ranges"
        );

        Ok(allocation)
    }

    /// Add a root block to a class pool
    ///
    /// # Errors
    /// - `InvalidRequest` if the block overlaps anything the pool already
    ///   holds, available or allocated
    pub async fn provision(&self, class: ResourceClass, block: CidrBlock) -> AllocationResult<()> {
        let mut tx = self.store.begin(class).await?;
        let result: AllocationResult<()> = async {
            if let Some(existing) = tx.find_overlap(&block).await? {
                return Err(AllocationError::InvalidRequest(format!(
                    "{} overlaps {} already in the {} pool",
                    block, existing, class
                )));
            }

            tx.insert_available(block, None).await
        }
        .await;

        finish(tx, result).await?;
        info!(class = %class, block = %block, "provisioned pool block");
        Ok(())
    }

    /// Available blocks of a class, in ascending address order
    pub async fn available(&self, class: ResourceClass) -> AllocationResult<Vec<AvailableBlock>> {
        let mut tx = self.store.begin(class).await?;
        let result = tx.list_available().await;
        finish(tx, result).await
    }

    /// Allocation records of a class, in creation order
    pub async fn allocations(&self, class: ResourceClass) -> AllocationResult<Vec<AllocationRecord>> {
        let mut tx = self.store.begin(class).await?;
        let result = tx.list_allocated().await;
        finish(tx, result).await
    }
}

async fn snapshot<T: PoolTransaction>(tx: &mut T) -> AllocationResult<Vec<CidrBlock>> {
    let available = tx.list_available().await?;
    debug!(class = %tx.class(), blocks = available.len(), "snapshot of available blocks");
    Ok(available.into_iter().map(|entry| entry.block).collect())
}

/// Apply planned changes inside a transaction
///
/// Order: remove the consumed block, record the allocations, release the
/// siblings. Each sibling is tagged with the block it was split from.
async fn apply_changes<T: PoolTransaction>(
    tx: &mut T,
    changes: &PoolChanges,
    claimant: &Claimant<'_>,
) -> AllocationResult<Vec<AllocationRecord>> {
    tx.remove_available(&changes.consumed).await?;

    let mut records = Vec::with_capacity(changes.allocations.len());
    for planned in &changes.allocations {
        let record = tx
            .insert_allocated(NewAllocation {
                project: claimant.project.to_string(),
                host_network: claimant.host_network.to_string(),
                block: planned.block,
                role: planned.role,
                owner: claimant.owner.to_string(),
                parent: planned.parent,
            })
            .await?;
        records.push(record);
    }

    for sibling in &changes.released {
        tx.insert_available(*sibling, sibling.supernet()).await?;
    }

    Ok(records)
}

/// Commit on success, roll back on failure
async fn finish<T: PoolTransaction, R>(tx: T, result: AllocationResult<R>) -> AllocationResult<R> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            let class = tx.class();
            if let Err(rollback_err) = tx.rollback().await {
                warn!(class = %class, error = %rollback_err, "rollback failed");
            }
            debug!(class = %class, kind = err.kind(), error = %err, "transaction aborted");
            Err(err)
        }
    }
}
