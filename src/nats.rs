//! NATS connection setup

use async_nats::{Client, ConnectOptions};
use std::time::Duration;
use tracing::info;

use crate::errors::{AllocationError, AllocationResult};

/// Configuration for NATS connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "subnet-allocator".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Connect to NATS with the given configuration
///
/// Connection failures surface as `PersistenceFailure`, since the store is
/// unreachable without a connection.
pub async fn connect(config: &NatsConfig) -> AllocationResult<Client> {
    let connect_options = ConnectOptions::new()
        .name(&config.name)
        .connection_timeout(config.connect_timeout)
        .request_timeout(Some(config.request_timeout));

    let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
        .await
        .map_err(|e| AllocationError::PersistenceFailure(e.to_string()))?;

    info!("Connected to NATS at {:?}", config.servers);

    Ok(client)
}
