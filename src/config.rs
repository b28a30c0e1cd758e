//! Startup configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::{FederationError, Result};

/// Entity resolver tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Upper bound for a single lookup, in milliseconds
    pub lookup_timeout_ms: u64,

    /// Maximum number of lookups in flight per batch
    pub max_concurrency: usize,

    /// Look up identical (typename, key) pairs once per batch
    pub dedupe_keys: bool,
}

impl ResolverConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lookup_timeout_ms == 0 {
            return Err(FederationError::InvalidConfig(
                "'lookup_timeout_ms' must be positive".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(FederationError::InvalidConfig(
                "'max_concurrency' must be positive".to_string(),
            ));
        }
        if self.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(FederationError::InvalidConfig(format!(
                "'max_concurrency' must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: 5_000,
            max_concurrency: 16,
            dedupe_keys: true,
        }
    }
}

/// Review subgraph configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubgraphConfig {
    pub resolver: ResolverConfig,

    /// Log the composed SDL once at startup
    pub print_schema: bool,

    /// Keep directive definitions and the marker scalar in printed SDL
    pub include_directives: bool,
}

impl SubgraphConfig {
    /// Parse configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FederationError::InvalidConfig(e.to_string()))?;
        config.resolver.validate()?;
        Ok(config)
    }
}

impl Default for SubgraphConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            print_schema: false,
            include_directives: true,
        }
    }
}
