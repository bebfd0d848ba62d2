// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Classes and Allocation Roles
//!
//! The address space is tracked as two entirely disjoint pools, one per
//! [`ResourceClass`]. Every allocation record carries an [`AllocationRole`]
//! that must be valid for its class.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Independently tracked address pool class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// Plain VM subnets
    Normal,
    /// Kubernetes cluster ranges (primary, services, pods)
    Kubernetes,
}

impl ResourceClass {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Kubernetes => "kubernetes",
        }
    }

    /// Roles an allocation record of this class may carry
    pub fn roles(&self) -> &'static [AllocationRole] {
        match self {
            Self::Normal => &[AllocationRole::Subnet],
            Self::Kubernetes => &[
                AllocationRole::Primary,
                AllocationRole::Services,
                AllocationRole::Pods,
            ],
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "kubernetes" | "k8s" => Ok(Self::Kubernetes),
            other => Err(format!(
                "Invalid resource class '{}'. Valid options: normal, kubernetes",
                other
            )),
        }
    }
}

/// Role tag of an allocation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationRole {
    /// Kubernetes primary (node) range; encloses the services and pods ranges
    Primary,
    /// Kubernetes services range
    Services,
    /// Kubernetes pods range
    Pods,
    /// Normal-class subnet
    Subnet,
}

impl AllocationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Services => "services",
            Self::Pods => "pods",
            Self::Subnet => "subnet",
        }
    }

    /// Container roles enclose other records of the same allocation
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Primary)
    }
}

impl fmt::Display for AllocationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
