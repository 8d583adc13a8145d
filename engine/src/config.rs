//! Synchronization options.
//!
//! Options can be read from environment variables or from JSON. Every
//! field has a default, so an empty environment yields a working setup.

use crate::{
    ConflictResolutionPass, EqualityKind, FileEquality, PathFilter, ResolutionPolicy,
    Synchronizer,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

/// Environment variable selecting the equality oracle.
pub const ENV_EQUALITY: &str = "SYNC_EQUALITY";
/// Environment variable selecting the resolution policy.
pub const ENV_RESOLUTION_POLICY: &str = "SYNC_RESOLUTION_POLICY";
/// Environment variable listing excluded path prefixes, comma separated.
pub const ENV_EXCLUDED_PATHS: &str = "SYNC_EXCLUDED_PATHS";

/// Engine options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncOptions {
    /// How files are compared
    pub equality: EqualityKind,
    /// How open conflicts are settled
    pub resolution_policy: ResolutionPolicy,
    /// Rooted path prefixes that never take part in synchronization
    pub excluded_paths: Vec<String>,
}

impl SyncOptions {
    /// Load options from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load options through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let equality = match lookup(ENV_EQUALITY).as_deref().map(str::trim) {
            None | Some("") => EqualityKind::default(),
            Some("metadata") => EqualityKind::Metadata,
            Some("contentHash") | Some("content-hash") => EqualityKind::ContentHash,
            Some(other) => return Err(ConfigError::InvalidEquality(other.to_string())),
        };

        let resolution_policy = match lookup(ENV_RESOLUTION_POLICY).as_deref().map(str::trim) {
            None | Some("") => ResolutionPolicy::default(),
            Some("uniqueSink") | Some("unique-sink") => ResolutionPolicy::UniqueSink,
            Some("latestWriteTime") | Some("latest-write-time") => {
                ResolutionPolicy::LatestWriteTime
            }
            Some(other) => return Err(ConfigError::InvalidResolutionPolicy(other.to_string())),
        };

        let excluded_paths = lookup(ENV_EXCLUDED_PATHS)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let options = Self {
            equality,
            resolution_policy,
            excluded_paths,
        };
        options.path_filter()?;
        Ok(options)
    }

    /// Parse options from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;
        options.path_filter()?;
        Ok(options)
    }

    pub fn equality(&self) -> Arc<dyn FileEquality> {
        self.equality.build()
    }

    pub fn path_filter(&self) -> Result<PathFilter, ConfigError> {
        PathFilter::from_prefixes(&self.excluded_paths)
            .map_err(|e| ConfigError::InvalidExcludedPath(e.to_string()))
    }

    /// A synchronizer using the configured oracle and filter.
    pub fn synchronizer(&self) -> Result<Synchronizer, ConfigError> {
        Ok(Synchronizer::new(self.equality()).with_filter(self.path_filter()?))
    }

    /// A resolution pass using the configured policy and oracle.
    pub fn resolver(&self) -> ConflictResolutionPass {
        ConflictResolutionPass::new(self.resolution_policy.build(), self.equality())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid SYNC_EQUALITY value: {0}")]
    InvalidEquality(String),

    #[error("invalid SYNC_RESOLUTION_POLICY value: {0}")]
    InvalidResolutionPolicy(String),

    #[error("invalid excluded path: {0}")]
    InvalidExcludedPath(String),

    #[error("invalid options JSON: {0}")]
    InvalidJson(String),
}
