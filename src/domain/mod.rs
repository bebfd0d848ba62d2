// Copyright (c) 2025 - Cowboy AI, Inc.
//! Address Pool Domain Models
//!
//! Core domain concepts for CIDR bookkeeping: the block value object, the
//! two resource classes, the entries a pool holds, and the pure invariants
//! that every pool state must satisfy.
//!
//! # Value Objects with Invariants
//!
//! - [`CidrBlock`] - IPv4/IPv6 network in strict CIDR notation
//! - [`ResourceClass`] - `normal` or `kubernetes` pool
//! - [`AllocationRole`] - role tag of an allocation record
//!
//! # Pool Entries
//!
//! - [`AvailableBlock`] - free block, optionally tagged with the block it was split from
//! - [`AllocationRecord`] - durable claim of one block

pub mod allocation;
pub mod cidr;
pub mod invariants;
pub mod resource_class;

pub use allocation::{AllocationRecord, AvailableBlock, NewAllocation};
pub use cidr::{validate_cidr_format, AddressFamily, CidrBlock, NetworkError, Subnets};
pub use invariants::{ValidationError, ValidationResult};
pub use resource_class::{AllocationRole, ResourceClass};
