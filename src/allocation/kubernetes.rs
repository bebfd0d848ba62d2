// Copyright (c) 2025 - Cowboy AI, Inc.
//! Kubernetes Allocation Planning
//!
//! A Kubernetes request claims three nested ranges: a primary range, and
//! services and pods ranges carved disjointly out of the primary.
//!
//! # Carve Order
//!
//! ```text
//! parent ──split──► primary + parent siblings
//! primary ──split──► services + services siblings
//! best-fit(services siblings) ──split──► pods + pods siblings
//! ```
//!
//! Pods are always carved from space the services split set aside, never
//! from the primary directly, so the two ranges cannot coincide. The
//! hierarchy and the partition of the parent are re-verified before the
//! plan is returned.

use serde::{Deserialize, Serialize};

use crate::allocation::{
    select_candidate, split, validate_requested_prefix, PlannedAllocation, PoolChanges,
};
use crate::domain::invariants::{
    validate_conservation, validate_kubernetes_hierarchy, validate_non_empty,
};
use crate::domain::{AllocationRole, CidrBlock, ResourceClass};
use crate::errors::{AllocationError, AllocationResult};

/// Required prefix lengths of the three Kubernetes ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesPrefixes {
    pub primary: u8,
    pub services: u8,
    pub pods: u8,
}

impl KubernetesPrefixes {
    pub fn new(primary: u8, services: u8, pods: u8) -> Self {
        Self {
            primary,
            services,
            pods,
        }
    }

    /// Prefix of the most space-demanding role (the shortest prefix)
    pub fn most_demanding(&self) -> u8 {
        self.primary.min(self.services).min(self.pods)
    }

    /// Validate the three lengths against each other
    ///
    /// # Rules
    /// - Every length is between /1 and /128
    /// - Services and pods are strictly longer than primary, so both fit
    ///   inside it without consuming all of it
    pub fn validate(&self) -> AllocationResult<()> {
        validate_requested_prefix("primary", self.primary)?;
        validate_requested_prefix("services", self.services)?;
        validate_requested_prefix("pods", self.pods)?;

        for (role, prefix) in [("services", self.services), ("pods", self.pods)] {
            if prefix <= self.primary {
                return Err(AllocationError::InvalidPrefix(format!(
                    "{} prefix /{} must be longer than primary prefix /{}",
                    role, prefix, self.primary
                )));
            }
        }
        Ok(())
    }
}

/// Request for one Kubernetes cluster's ranges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesRequest {
    pub project: String,
    pub host_network: String,
    pub prefixes: KubernetesPrefixes,
    pub owner: String,
}

impl KubernetesRequest {
    pub fn new(
        project: impl Into<String>,
        host_network: impl Into<String>,
        prefixes: KubernetesPrefixes,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            host_network: host_network.into(),
            prefixes,
            owner: owner.into(),
        }
    }

    pub fn validate(&self) -> AllocationResult<()> {
        validate_non_empty("project", &self.project)?;
        validate_non_empty("host network", &self.host_network)?;
        validate_non_empty("owner", &self.owner)?;
        self.prefixes.validate()
    }
}

/// Planned outcome of a Kubernetes request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubernetesPlan {
    pub parent: CidrBlock,
    pub primary: CidrBlock,
    pub services: CidrBlock,
    pub pods: CidrBlock,
    /// Siblings from narrowing the parent to the primary
    pub parent_siblings: Vec<CidrBlock>,
    /// Siblings from narrowing the primary to services, minus the block pods were carved from
    pub services_siblings: Vec<CidrBlock>,
    /// Siblings from narrowing that block to pods
    pub pods_siblings: Vec<CidrBlock>,
}

impl KubernetesPlan {
    /// Every block returned to the pool
    pub fn released(&self) -> Vec<CidrBlock> {
        self.parent_siblings
            .iter()
            .chain(&self.services_siblings)
            .chain(&self.pods_siblings)
            .copied()
            .collect()
    }

    /// Pool mutations this plan implies
    pub fn changes(&self) -> PoolChanges {
        PoolChanges {
            class: ResourceClass::Kubernetes,
            consumed: self.parent,
            allocations: vec![
                PlannedAllocation {
                    block: self.primary,
                    role: AllocationRole::Primary,
                    parent: Some(self.parent),
                },
                PlannedAllocation {
                    block: self.services,
                    role: AllocationRole::Services,
                    parent: Some(self.primary),
                },
                PlannedAllocation {
                    block: self.pods,
                    role: AllocationRole::Pods,
                    parent: Some(self.primary),
                },
            ],
            released: self.released(),
        }
    }
}

/// Plan a Kubernetes allocation against a snapshot of available blocks
pub fn plan_kubernetes(
    available: &[CidrBlock],
    request: &KubernetesRequest,
) -> AllocationResult<KubernetesPlan> {
    request.validate()?;
    let prefixes = request.prefixes;

    let wanted = prefixes.most_demanding();
    let parent = select_candidate(available, wanted).ok_or(AllocationError::NoAvailableBlock {
        class: ResourceClass::Kubernetes,
        prefix: wanted,
    })?;

    let primary_split = split(&parent, prefixes.primary)?;
    let primary = primary_split.leaf;

    let services_split = split(&primary, prefixes.services)?;
    let services = services_split.leaf;

    let pods_source = select_candidate(&services_split.siblings, prefixes.pods).ok_or_else(|| {
        AllocationError::HierarchyViolation(format!(
            "no space left in {} for a /{} pods range after carving services {}",
            primary, prefixes.pods, services
        ))
    })?;
    let pods_split = split(&pods_source, prefixes.pods)?;
    let pods = pods_split.leaf;

    let services_siblings: Vec<CidrBlock> = services_split
        .siblings
        .into_iter()
        .filter(|block| *block != pods_source)
        .collect();

    let plan = KubernetesPlan {
        parent,
        primary,
        services,
        pods,
        parent_siblings: primary_split.siblings,
        services_siblings,
        pods_siblings: pods_split.siblings,
    };

    validate_kubernetes_hierarchy(&plan.primary, &plan.services, &plan.pods)?;

    let mut parts = plan.released();
    parts.extend([plan.services, plan.pods]);
    validate_conservation(&plan.parent, &parts)?;

    Ok(plan)
}

/// Committed result of a Kubernetes allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesAllocation {
    pub project: String,
    pub host_network: String,
    pub parent: CidrBlock,
    pub primary: CidrBlock,
    pub services: CidrBlock,
    pub pods: CidrBlock,
    pub released: Vec<CidrBlock>,
}
