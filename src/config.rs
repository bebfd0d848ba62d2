// Copyright (c) 2025 - Cowboy AI, Inc.
//! Environment-driven configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `SUBNET_ALLOCATOR_BACKEND` | `memory` |
//! | `NATS_URL` | `nats://localhost:4222` |
//! | `NATS_CLIENT_NAME` | `subnet-allocator` |
//! | `NATS_STREAM` | `SUBNET_POOLS` |
//! | `NATS_STORAGE` | `file` |
//! | `NATS_REPLICAS` | `1` |
//! | `SUBNET_ALLOCATOR_MAX_ATTEMPTS` | `3` |
//! | `SUBNET_ALLOCATOR_RETRY_BACKOFF_MS` | `200` |
//! | `GCP_PROJECT`, `HOST_VPC`, `GITLAB_USER_EMAIL` | unset |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::jetstream::{PoolStreamConfig, StorageType};
use crate::nats::NatsConfig;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: &'static str, message: String },
}

impl ConfigError {
    fn invalid(var: &'static str, message: impl fmt::Display) -> Self {
        Self::InvalidValue {
            var,
            message: message.to_string(),
        }
    }
}

/// Which pool store backs the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// In-process pools, lost on exit
    Memory,
    /// NATS JetStream pools
    Nats,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "nats" => Ok(Self::Nats),
            other => Err(format!("unknown backend '{}' (expected memory or nats)", other)),
        }
    }
}

/// Caller-side retry of retryable allocation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each one after
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

/// Request identity taken from the CI environment when not given explicitly
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDefaults {
    pub project: Option<String>,
    pub host_network: Option<String>,
    pub owner: Option<String>,
}

/// Complete allocator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorConfig {
    pub backend: Backend,
    pub nats: NatsConfig,
    pub stream: PoolStreamConfig,
    pub retry: RetryPolicy,
    pub defaults: RequestDefaults,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            nats: NatsConfig::default(),
            stream: PoolStreamConfig::default(),
            retry: RetryPolicy::default(),
            defaults: RequestDefaults::default(),
        }
    }
}

impl AllocatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("SUBNET_ALLOCATOR_BACKEND") {
            config.backend = value
                .parse()
                .map_err(|e| ConfigError::invalid("SUBNET_ALLOCATOR_BACKEND", e))?;
        }

        if let Some(value) = get("NATS_URL") {
            config.nats.servers = value
                .split(',')
                .map(str::trim)
                .filter(|server| !server.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(value) = get("NATS_CLIENT_NAME") {
            config.nats.name = value;
        }

        if let Some(value) = get("NATS_STREAM") {
            config.stream.stream_name = value;
        }
        if let Some(value) = get("NATS_STORAGE") {
            config.stream.storage = value
                .parse::<StorageType>()
                .map_err(|e| ConfigError::invalid("NATS_STORAGE", e))?;
        }
        if let Some(value) = get("NATS_REPLICAS") {
            config.stream.replicas = parse_positive("NATS_REPLICAS", &value)?;
        }

        if let Some(value) = get("SUBNET_ALLOCATOR_MAX_ATTEMPTS") {
            config.retry.max_attempts = parse_positive("SUBNET_ALLOCATOR_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = get("SUBNET_ALLOCATOR_RETRY_BACKOFF_MS") {
            let millis: u64 = value
                .parse()
                .map_err(|e| ConfigError::invalid("SUBNET_ALLOCATOR_RETRY_BACKOFF_MS", e))?;
            config.retry.base_backoff = Duration::from_millis(millis);
        }

        config.defaults = RequestDefaults {
            project: get("GCP_PROJECT"),
            host_network: get("HOST_VPC"),
            owner: get("GITLAB_USER_EMAIL"),
        };

        Ok(config)
    }
}

fn parse_positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let parsed: T = value.parse().map_err(|e| ConfigError::invalid(var, e))?;
    if parsed <= T::default() {
        return Err(ConfigError::invalid(var, "must be at least 1"));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AllocatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AllocatorConfig::default());
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.defaults.owner, None);
    }

    #[test]
    fn test_overrides() {
        let config = AllocatorConfig::from_lookup(lookup(&[
            ("SUBNET_ALLOCATOR_BACKEND", "NATS"),
            ("NATS_URL", "nats://a:4222, nats://b:4222"),
            ("NATS_STREAM", "POOLS_STAGING"),
            ("NATS_STORAGE", "memory"),
            ("NATS_REPLICAS", "3"),
            ("SUBNET_ALLOCATOR_MAX_ATTEMPTS", "5"),
            ("SUBNET_ALLOCATOR_RETRY_BACKOFF_MS", "50"),
            ("GCP_PROJECT", "proj-a"),
            ("HOST_VPC", "shared-vpc"),
            ("GITLAB_USER_EMAIL", "alice@example.com"),
        ]))
        .unwrap();

        assert_eq!(config.backend, Backend::Nats);
        assert_eq!(config.nats.servers, vec!["nats://a:4222", "nats://b:4222"]);
        assert_eq!(config.stream.stream_name, "POOLS_STAGING");
        assert_eq!(config.stream.storage, StorageType::Memory);
        assert_eq!(config.stream.replicas, 3);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_backoff, Duration::from_millis(50));
        assert_eq!(config.defaults.project.as_deref(), Some("proj-a"));
        assert_eq!(config.defaults.host_network.as_deref(), Some("shared-vpc"));
        assert_eq!(config.defaults.owner.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_invalid_values() {
        let err = AllocatorConfig::from_lookup(lookup(&[("SUBNET_ALLOCATOR_BACKEND", "mysql")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "SUBNET_ALLOCATOR_BACKEND",
                ..
            }
        ));

        let err = AllocatorConfig::from_lookup(lookup(&[("SUBNET_ALLOCATOR_MAX_ATTEMPTS", "0")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "SUBNET_ALLOCATOR_MAX_ATTEMPTS",
                ..
            }
        ));

        assert!(AllocatorConfig::from_lookup(lookup(&[("NATS_REPLICAS", "two")])).is_err());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = AllocatorConfig::from_lookup(lookup(&[("GCP_PROJECT", "  ")])).unwrap();
        assert_eq!(config.defaults.project, None);
    }

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryPolicy {
            max_attempts: 4,
            base_backoff: Duration::from_millis(100),
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(200));
        assert_eq!(retry.backoff(3), Duration::from_millis(400));
    }
}
