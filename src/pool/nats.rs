// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS JetStream Pool Store
//!
//! Persists each class pool as the ordered list of [`PoolCommit`] messages
//! on its own subject, and rebuilds the pool by folding them.
//!
//! # Transaction Semantics
//!
//! 1. `begin` replays the commits on the class subject and remembers the
//!    stream sequence of the last one. The store keeps the folded state of
//!    each class, so only commits newer than the last replay are fetched
//! 2. Operations are staged locally
//! 3. `commit` publishes the whole journal as one message, with the
//!    `Nats-Expected-Last-Subject-Sequence` header set to the remembered
//!    sequence
//!
//! If another transaction committed to the same class in between, the
//! server rejects the publish and the caller gets a retryable
//! `PersistenceFailure`. Nothing was written, so a retry from a fresh
//! snapshot is always safe.

use async_nats::jetstream::{self, consumer, context::Publish, stream::Stream};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{AllocationRecord, AvailableBlock, CidrBlock, NewAllocation, ResourceClass};
use crate::errors::{AllocationError, AllocationResult};
use crate::jetstream::{create_pool_stream, PoolStreamConfig};
use crate::nats::{connect, NatsConfig};
use crate::pool::state::{PoolCommit, PoolState, StagedPool};
use crate::pool::{AddressPoolStore, PoolTransaction};
use crate::subjects::PoolSubjects;

/// Upper bound on messages pulled per fetch during replay
const REPLAY_BATCH_SIZE: usize = 1000;

/// JetStream-backed pool store
///
/// # Example
///
/// ```rust,no_run
/// use subnet_allocator::jetstream::PoolStreamConfig;
/// use subnet_allocator::nats::NatsConfig;
/// use subnet_allocator::pool::NatsPoolStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = NatsPoolStore::connect(&NatsConfig::default(), PoolStreamConfig::default()).await?;
///     // Use store...
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct NatsPoolStore {
    jetstream: jetstream::Context,
    stream: Stream,
    subjects: PoolSubjects,
    fetch_timeout: Duration,
    replayed: Arc<Mutex<HashMap<ResourceClass, ReplayedPool>>>,
}

/// Folded pool state as of a stream sequence
#[derive(Debug, Clone, Default)]
struct ReplayedPool {
    state: PoolState,
    last_sequence: u64,
}

impl NatsPoolStore {
    /// Connect to NATS and create or open the pool stream
    pub async fn connect(nats: &NatsConfig, config: PoolStreamConfig) -> AllocationResult<Self> {
        let client = connect(nats).await?;
        let jetstream = jetstream::new(client);
        let stream = create_pool_stream(&jetstream, &config).await?;

        info!(stream = %config.stream_name, "opened pool stream");

        Ok(Self {
            jetstream,
            stream,
            subjects: config.subjects,
            fetch_timeout: nats.request_timeout,
            replayed: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Rebuild a class pool and return it with the sequence of its last commit
    ///
    /// A sequence of 0 means the class has no commits yet. Replay resumes
    /// after the last sequence this store has already folded.
    async fn replay(&self, class: ResourceClass) -> AllocationResult<(PoolState, u64)> {
        let cached = self
            .replayed
            .lock()
            .await
            .get(&class)
            .cloned()
            .unwrap_or_default();

        let deliver_policy = match cached.last_sequence {
            0 => consumer::DeliverPolicy::All,
            last => consumer::DeliverPolicy::ByStartSequence {
                start_sequence: last + 1,
            },
        };

        let consumer = self
            .stream
            .create_consumer(consumer::pull::Config {
                filter_subject: self.subjects.pool(class),
                deliver_policy,
                ack_policy: consumer::AckPolicy::None,
                inactive_threshold: Duration::from_secs(60),
                ..Default::default()
            })
            .await
            .map_err(|e| AllocationError::PersistenceFailure(e.to_string()))?;

        let name = consumer.cached_info().name.clone();
        let result = self.fold_pending(class, &consumer, cached).await;

        if let Err(e) = self.stream.delete_consumer(&name).await {
            // The server drops it after the inactivity threshold anyway.
            warn!(class = %class, consumer = %name, error = %e, "failed to delete replay consumer");
        }

        let replayed = result?;

        let mut cache = self.replayed.lock().await;
        let newest = cache
            .get(&class)
            .map_or(true, |entry| entry.last_sequence < replayed.last_sequence);
        if newest {
            cache.insert(class, replayed.clone());
        }

        Ok((replayed.state, replayed.last_sequence))
    }

    /// Apply every commit the consumer has pending on top of `pool`
    async fn fold_pending(
        &self,
        class: ResourceClass,
        consumer: &consumer::PullConsumer,
        mut pool: ReplayedPool,
    ) -> AllocationResult<ReplayedPool> {
        let subject = self.subjects.pool(class);
        let pending = usize::try_from(consumer.cached_info().num_pending)
            .map_err(|e| AllocationError::PersistenceFailure(e.to_string()))?;
        let mut received = 0;

        while received < pending {
            let mut messages = consumer
                .fetch()
                .max_messages(REPLAY_BATCH_SIZE.min(pending - received))
                .expires(self.fetch_timeout)
                .messages()
                .await
                .map_err(|e| AllocationError::PersistenceFailure(e.to_string()))?;

            let mut batch_count = 0;

            while let Some(message) = messages.next().await {
                let message =
                    message.map_err(|e| AllocationError::PersistenceFailure(e.to_string()))?;

                let info = message
                    .info()
                    .map_err(|e| AllocationError::PersistenceFailure(e.to_string()))?;
                pool.last_sequence = info.stream_sequence;

                let commit: PoolCommit = serde_json::from_slice(&message.payload)?;
                for mutation in &commit.mutations {
                    pool.state.apply(class, mutation)?;
                }

                batch_count += 1;
            }

            // An empty batch means the server had nothing more to give within
            // the timeout; the snapshot would be incomplete.
            if batch_count == 0 {
                return Err(AllocationError::PersistenceFailure(format!(
                    "replay of {} stalled after {} of {} commits",
                    subject, received, pending
                )));
            }
            received += batch_count;
        }

        debug!(
            class = %class,
            commits = received,
            last_sequence = pool.last_sequence,
            "replayed pool"
        );

        Ok(pool)
    }
}

#[async_trait]
impl AddressPoolStore for NatsPoolStore {
    type Transaction = NatsTransaction;

    async fn begin(&self, class: ResourceClass) -> AllocationResult<Self::Transaction> {
        let (state, expected_sequence) = self.replay(class).await?;

        Ok(NatsTransaction {
            jetstream: self.jetstream.clone(),
            subject: self.subjects.pool(class),
            expected_sequence,
            staged: StagedPool::new(class, state),
        })
    }
}

/// Transaction staged locally and published as one commit message
pub struct NatsTransaction {
    jetstream: jetstream::Context,
    subject: String,
    expected_sequence: u64,
    staged: StagedPool,
}

#[async_trait]
impl PoolTransaction for NatsTransaction {
    fn class(&self) -> ResourceClass {
        self.staged.class()
    }

    async fn list_available(&mut self) -> AllocationResult<Vec<AvailableBlock>> {
        Ok(self.staged.list_available())
    }

    async fn list_allocated(&mut self) -> AllocationResult<Vec<AllocationRecord>> {
        Ok(self.staged.list_allocated())
    }

    async fn remove_available(&mut self, block: &CidrBlock) -> AllocationResult<()> {
        self.staged.remove_available(block)
    }

    async fn insert_available(
        &mut self,
        block: CidrBlock,
        parent: Option<CidrBlock>,
    ) -> AllocationResult<()> {
        self.staged.insert_available(block, parent)
    }

    async fn insert_allocated(
        &mut self,
        allocation: NewAllocation,
    ) -> AllocationResult<AllocationRecord> {
        self.staged.insert_allocated(allocation)
    }

    async fn commit(self) -> AllocationResult<()> {
        let class = self.staged.class();
        let (_, mutations) = self.staged.into_parts();
        if mutations.is_empty() {
            return Ok(());
        }

        let commit = PoolCommit::new(class, mutations);
        let payload = serde_json::to_vec(&commit)?;

        let publish = Publish::build()
            .payload(payload.into())
            .expected_last_subject_sequence(self.expected_sequence);

        let ack = self
            .jetstream
            .send_publish(self.subject.clone(), publish)
            .await
            .map_err(|e| AllocationError::PersistenceFailure(e.to_string()))?
            .await
            .map_err(|e| {
                warn!(
                    class = %class,
                    expected_sequence = self.expected_sequence,
                    error = %e,
                    "pool commit rejected"
                );
                AllocationError::PersistenceFailure(e.to_string())
            })?;

        debug!(
            class = %class,
            commit_id = %commit.commit_id,
            sequence = ack.sequence,
            mutations = commit.mutations.len(),
            "committed pool transaction"
        );

        Ok(())
    }

    async fn rollback(self) -> AllocationResult<()> {
        debug!(
            class = %self.staged.class(),
            discarded = self.staged.journal().len(),
            "rolled back pool transaction"
        );
        Ok(())
    }
}
