//! CIDR allocation for normal and Kubernetes address pools
//!
//! This crate carves subnets out of per-class pools of free address space.
//! Planning is pure (best-fit selection plus single-path splitting); every
//! allocation is applied to the pool inside one store transaction, backed
//! either by process memory or by NATS JetStream.

pub mod allocation;
pub mod config;
pub mod domain;
pub mod errors;
pub mod jetstream;
pub mod nats;
pub mod pool;
pub mod report;
pub mod service;
pub mod subjects;

// Re-export commonly used types
pub use allocation::{KubernetesAllocation, KubernetesPrefixes, KubernetesRequest, NormalAllocation, NormalRequest};
pub use config::{AllocatorConfig, Backend, ConfigError, RetryPolicy};
pub use domain::{AllocationRecord, AllocationRole, AvailableBlock, CidrBlock, ResourceClass};
pub use errors::{AllocationError, AllocationResult};
pub use pool::{AddressPoolStore, InMemoryPoolStore, NatsPoolStore, PoolTransaction};
pub use report::AllocationReport;
pub use service::SubnetAllocator;
