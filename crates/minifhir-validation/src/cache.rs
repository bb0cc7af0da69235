//! On-disk cache of derived rule sets.
//!
//! One JSON file per profile URL holding `{version, rules}`. Reads never fail:
//! a missing, stale, corrupt or mismatched file is a miss.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::rules::RuleSet;

/// Cache format version written when none is configured.
pub const CACHE_VERSION: i64 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    version: i64,
    rules: Option<RuleSet>,
}

/// Directory of cached rule sets.
#[derive(Debug, Clone)]
pub struct ProfileCache {
    dir: PathBuf,
    ttl: Option<Duration>,
    version: i64,
}

impl ProfileCache {
    /// `ttl` of zero disables expiry; a `version` of zero or below uses [`CACHE_VERSION`].
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration, version: i64) -> Self {
        Self {
            dir: dir.into(),
            ttl: (!ttl.is_zero()).then_some(ttl),
            version: if version <= 0 { CACHE_VERSION } else { version },
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// File backing a profile URL.
    pub fn path_for(&self, profile_url: &str) -> PathBuf {
        let sanitized = profile_url
            .replace("://", "_")
            .replace('/', "_")
            .replace('\\', "_");
        self.dir.join(format!("{sanitized}.json"))
    }

    /// Cached rules for a profile URL, if present, fresh and of this version.
    pub async fn read(&self, profile_url: &str) -> Option<RuleSet> {
        let path = self.path_for(profile_url);
        let metadata = tokio::fs::metadata(&path).await.ok()?;

        if let Some(ttl) = self.ttl {
            let modified = metadata.modified().ok()?;
            let age = SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO);
            if age > ttl {
                tracing::debug!(profile = profile_url, ?age, "profile cache entry expired");
                return None;
            }
        }

        let data = tokio::fs::read(&path).await.ok()?;
        let envelope: CacheEnvelope = match serde_json::from_slice(&data) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(profile = profile_url, error = %e, "ignoring corrupt profile cache entry");
                return None;
            }
        };
        if envelope.version != self.version {
            tracing::debug!(
                profile = profile_url,
                cached = envelope.version,
                expected = self.version,
                "profile cache version mismatch"
            );
            return None;
        }
        envelope.rules.filter(|rules| !rules.resource_type.is_empty())
    }

    /// Persist rules for a profile URL, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Cache`] when the directory or file cannot be written.
    pub async fn write(&self, profile_url: &str, rules: &RuleSet) -> Result<(), ProfileError> {
        let path = self.path_for(profile_url);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec(&CacheEnvelope {
            version: self.version,
            rules: Some(rules.clone()),
        })?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }
}
