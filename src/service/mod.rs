// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for Subnet Allocation
//!
//! This module provides the application service layer that orchestrates
//! pure allocation planning and the address pool store.
//!
//! # Architecture
//!
//! ```text
//! Client Request (CLI)
//!     ↓
//! Service Layer (this module)
//!     ↓
//! Planner (pure) → PoolChanges
//!     ↓
//! Pool Transaction (memory or NATS JetStream)
//!     ↓
//! commit / rollback
//! ```
//!
//! # Design Principles
//!
//! 1. **Transaction Boundaries**: one store transaction per allocation call
//! 2. **Pure Domain Logic**: services call pure planners
//! 3. **No Hidden Retries**: retryable errors are returned to the caller
//! 4. **Async by Default**: all store I/O is asynchronous

pub mod allocator;
pub mod retry;

pub use allocator::SubnetAllocator;
pub use retry::with_retry;
