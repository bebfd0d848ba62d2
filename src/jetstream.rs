// Copyright (c) 2025 - Cowboy AI, Inc.

//! JetStream configuration and setup for pool commit streams
//!
//! The stream is the durable record of every pool, so it is configured to
//! keep messages forever: no age limit and limits-based retention.
//!
//! # Example
//!
//! ```rust,no_run
//! use subnet_allocator::jetstream::{create_pool_stream, PoolStreamConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = async_nats::connect("nats://localhost:4222").await?;
//!     let jetstream = async_nats::jetstream::new(client);
//!
//!     let stream = create_pool_stream(&jetstream, &PoolStreamConfig::default()).await?;
//!
//!     Ok(())
//! }
//! ```

use async_nats::jetstream::{self, stream::Stream};
use std::str::FromStr;

use crate::errors::{AllocationError, AllocationResult};
use crate::subjects::PoolSubjects;

/// Configuration for the pool commit stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStreamConfig {
    /// Stream name
    pub stream_name: String,

    /// Subject namespace for pool commits
    pub subjects: PoolSubjects,

    /// Storage type (File or Memory)
    pub storage: StorageType,

    /// Number of replicas (for clustered NATS)
    pub replicas: usize,
}

impl Default for PoolStreamConfig {
    fn default() -> Self {
        Self {
            stream_name: "SUBNET_POOLS".to_string(),
            subjects: PoolSubjects::default(),
            storage: StorageType::File,
            replicas: 1,
        }
    }
}

/// Storage type for JetStream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// File-based storage (persistent across restarts)
    File,
    /// Memory-based storage (faster, but lost on restart)
    Memory,
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "Invalid storage type '{}'. Valid options: file, memory",
                other
            )),
        }
    }
}

/// Create or update the pool commit stream
///
/// This function is idempotent - it will create the stream if it doesn't exist,
/// or return the existing one.
pub async fn create_pool_stream(
    jetstream: &jetstream::Context,
    config: &PoolStreamConfig,
) -> AllocationResult<Stream> {
    let storage = match config.storage {
        StorageType::File => jetstream::stream::StorageType::File,
        StorageType::Memory => jetstream::stream::StorageType::Memory,
    };

    let stream_config = jetstream::stream::Config {
        name: config.stream_name.clone(),
        subjects: vec![config.subjects.all_pools()],
        storage,
        num_replicas: config.replicas,
        retention: jetstream::stream::RetentionPolicy::Limits,
        ..Default::default()
    };

    jetstream
        .get_or_create_stream(stream_config)
        .await
        .map_err(|e| AllocationError::PersistenceFailure(e.to_string()))
}
