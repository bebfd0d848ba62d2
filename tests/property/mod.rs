// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! This module contains property-based tests using proptest to verify
//! fundamental properties of CIDR arithmetic and pool bookkeeping.

mod cidr_partition;
mod pool_conservation;
