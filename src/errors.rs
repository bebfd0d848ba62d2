// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for allocation operations

use thiserror::Error;

use crate::domain::{CidrBlock, NetworkError, ResourceClass, ValidationError};

/// Errors returned by the allocation engine and the pool stores
#[derive(Debug, Error)]
pub enum AllocationError {
    /// Target prefix is not deeper than the source, or is out of range
    #[error("Invalid prefix: {0}")]
    InvalidPrefix(String),

    /// CIDR text could not be parsed
    #[error("Invalid CIDR: {0}")]
    InvalidCidr(String),

    /// Request fields failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No block in the class pool can satisfy the request
    #[error("No available {class} block can supply a /{prefix}")]
    NoAvailableBlock { class: ResourceClass, prefix: u8 },

    /// Post-split containment or disjointness check failed
    #[error("Hierarchy violation: {0}")]
    HierarchyViolation(String),

    /// Store transaction could not complete
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Removal of a block the store does not hold as available
    #[error("{block} is not available in the {class} pool")]
    NotFound { class: ResourceClass, block: CidrBlock },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AllocationError {
    /// Whether the caller may retry the whole allocation from a fresh snapshot
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_) | Self::NotFound { .. })
    }

    /// Short machine-readable kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPrefix(_) => "invalid_prefix",
            Self::InvalidCidr(_) => "invalid_cidr",
            Self::InvalidRequest(_) => "invalid_request",
            Self::NoAvailableBlock { .. } => "no_available_block",
            Self::HierarchyViolation(_) => "hierarchy_violation",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::NotFound { .. } => "not_found",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Result type for allocation operations
pub type AllocationResult<T> = Result<T, AllocationError>;

impl From<NetworkError> for AllocationError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::InvalidPrefixLength(_) | NetworkError::PrefixNotDeeper { .. } => {
                AllocationError::InvalidPrefix(err.to_string())
            }
            NetworkError::InvalidIpAddress(_)
            | NetworkError::InvalidCidr(_)
            | NetworkError::HostBitsSet(_) => AllocationError::InvalidCidr(err.to_string()),
        }
    }
}

impl From<ValidationError> for AllocationError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyField { .. } | ValidationError::RoleClassMismatch { .. } => {
                AllocationError::InvalidRequest(err.to_string())
            }
            ValidationError::Overlap { .. }
            | ValidationError::NotContained { .. }
            | ValidationError::CapacityMismatch { .. } => {
                AllocationError::HierarchyViolation(err.to_string())
            }
        }
    }
}

impl From<async_nats::Error> for AllocationError {
    fn from(err: async_nats::Error) -> Self {
        AllocationError::PersistenceFailure(err.to_string())
    }
}

impl From<serde_json::Error> for AllocationError {
    fn from(err: serde_json::Error) -> Self {
        AllocationError::Serialization(err.to_string())
    }
}
