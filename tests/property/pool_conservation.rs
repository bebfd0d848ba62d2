// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Pool Conservation
//!
//! After any sequence of allocations against a single root, the available
//! blocks and the allocated blocks together partition the root exactly.
//! Failed requests must leave the pool as it was.

use proptest::prelude::*;

use subnet_allocator::allocation::{KubernetesPrefixes, KubernetesRequest, NormalRequest};
use subnet_allocator::domain::invariants::validate_conservation;
use subnet_allocator::domain::{CidrBlock, ResourceClass};
use subnet_allocator::pool::InMemoryPoolStore;
use subnet_allocator::service::SubnetAllocator;

fn root() -> CidrBlock {
    "10.0.0.0/16".parse().unwrap()
}

/// Available blocks plus every non-container allocation of `class`
async fn pool_parts(
    allocator: &SubnetAllocator<InMemoryPoolStore>,
    class: ResourceClass,
) -> Vec<CidrBlock> {
    let mut parts: Vec<CidrBlock> = allocator
        .available(class)
        .await
        .unwrap()
        .iter()
        .map(|entry| entry.block)
        .collect();
    parts.extend(
        allocator
            .allocations(class)
            .await
            .unwrap()
            .iter()
            .filter(|record| !record.role.is_container())
            .map(|record| record.block),
    );
    parts
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Normal allocations of any sizes keep the root partitioned
    #[test]
    fn prop_normal_allocations_conserve_root(prefixes in prop::collection::vec(16u8..=30, 1..20)) {
        tokio_test::block_on(async {
            let allocator = SubnetAllocator::new(InMemoryPoolStore::new());
            allocator.provision(ResourceClass::Normal, root()).await.unwrap();

            for prefix in &prefixes {
                let request = NormalRequest::new("proj", "vpc", *prefix, "owner");
                let before = pool_parts(&allocator, ResourceClass::Normal).await;

                if allocator.allocate_normal(&request).await.is_err() {
                    // A rejected request changes nothing.
                    assert_eq!(pool_parts(&allocator, ResourceClass::Normal).await, before);
                }

                let parts = pool_parts(&allocator, ResourceClass::Normal).await;
                assert!(validate_conservation(&root(), &parts).is_ok());
            }
        });
    }

    /// Kubernetes allocations keep the root partitioned, counting services
    /// and pods but not the enclosing primary
    #[test]
    fn prop_kubernetes_allocations_conserve_root(
        requests in prop::collection::vec((18u8..=24, 1u8..=4, 1u8..=4), 1..8)
    ) {
        tokio_test::block_on(async {
            let allocator = SubnetAllocator::new(InMemoryPoolStore::new());
            allocator.provision(ResourceClass::Kubernetes, root()).await.unwrap();

            for (primary, services_depth, pods_depth) in &requests {
                let prefixes = KubernetesPrefixes::new(
                    *primary,
                    primary + services_depth,
                    primary + pods_depth,
                );
                let request = KubernetesRequest::new("proj", "vpc", prefixes, "owner");

                if let Ok(allocation) = allocator.allocate_kubernetes(&request).await {
                    assert!(allocation.primary.contains(&allocation.services));
                    assert!(allocation.primary.contains(&allocation.pods));
                    assert!(!allocation.services.overlaps(&allocation.pods));
                }

                let parts = pool_parts(&allocator, ResourceClass::Kubernetes).await;
                assert!(validate_conservation(&root(), &parts).is_ok());
            }
        });
    }
}
