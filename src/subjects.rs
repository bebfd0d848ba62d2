// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for pool commit streams
//!
//! Every class pool is persisted as the ordered list of commits on its own
//! subject:
//!
//! ```text
//! subnets.pool.{class}
//! ```
//!
//! One subject per class keeps the optimistic concurrency check scoped to
//! a single pool, so commits on different classes never conflict.
//!
//! # Examples
//!
//! ```rust
//! use subnet_allocator::domain::ResourceClass;
//! use subnet_allocator::subjects::PoolSubjects;
//!
//! let subjects = PoolSubjects::default();
//! assert_eq!(subjects.pool(ResourceClass::Kubernetes), "subnets.pool.kubernetes");
//! assert_eq!(subjects.all_pools(), "subnets.pool.>");
//! ```

use crate::domain::ResourceClass;

/// Root namespace for all allocator subjects
pub const SUBNETS_ROOT: &str = "subnets";

/// Builder for per-class pool subjects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSubjects {
    root: String,
}

impl PoolSubjects {
    /// Subjects under a custom root (e.g. one root per environment)
    pub fn with_root(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Subject holding the commits of `class`
    pub fn pool(&self, class: ResourceClass) -> String {
        format!("{}.pool.{}", self.root, class)
    }

    /// Wildcard covering every class pool
    pub fn all_pools(&self) -> String {
        format!("{}.pool.>", self.root)
    }
}

impl Default for PoolSubjects {
    fn default() -> Self {
        Self::with_root(SUBNETS_ROOT)
    }
}
