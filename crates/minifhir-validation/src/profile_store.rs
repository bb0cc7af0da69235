//! Profile store: rule sets keyed by profile URL.
//!
//! The table is filled at startup by [`ProfileStore::load_defaults`] while the
//! store is still exclusively owned, then shared read-only.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use minifhir_core::ResourceRegistry;

use crate::cache::{CACHE_VERSION, ProfileCache};
use crate::error::ProfileError;
use crate::rules::RuleSet;

/// Settings for fetching and caching profiles.
#[derive(Debug, Clone)]
pub struct ProfileStoreConfig {
    /// Cache directory; `None` disables the disk cache.
    pub cache_dir: Option<PathBuf>,
    /// Maximum cache entry age; zero disables expiry.
    pub cache_ttl: Duration,
    /// Cache format version; zero or below uses the built-in version.
    pub cache_version: i64,
    /// Timeout for each profile fetch (default: 15 seconds).
    pub fetch_timeout: Duration,
}

impl Default for ProfileStoreConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_ttl: Duration::ZERO,
            cache_version: CACHE_VERSION,
            fetch_timeout: Duration::from_secs(15),
        }
    }
}

impl ProfileStoreConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_cache_version(mut self, version: i64) -> Self {
        self.cache_version = version;
        self
    }

    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// Rule sets keyed by profile URL.
#[derive(Debug)]
pub struct ProfileStore {
    profiles: HashMap<String, RuleSet>,
    cache: Option<ProfileCache>,
    client: reqwest::Client,
}

impl ProfileStore {
    /// Creates an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ProfileStoreConfig) -> Result<Self, ProfileError> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()?;
        let cache = config
            .cache_dir
            .map(|dir| ProfileCache::new(dir, config.cache_ttl, config.cache_version));

        Ok(Self {
            profiles: HashMap::new(),
            cache,
            client,
        })
    }

    /// Registers rules for a profile URL, replacing any previous set.
    pub fn add(&mut self, profile_url: impl Into<String>, rules: RuleSet) {
        self.profiles.insert(profile_url.into(), rules);
    }

    pub fn get(&self, profile_url: &str) -> Option<&RuleSet> {
        self.profiles.get(profile_url)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn cache(&self) -> Option<&ProfileCache> {
        self.cache.as_ref()
    }

    /// Loads the base profile of every registered type that has a source.
    ///
    /// Types are visited in name order, one at a time. The first failure
    /// aborts the load.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Load`] naming the profile that failed.
    pub async fn load_defaults(&mut self, registry: &ResourceRegistry) -> Result<(), ProfileError> {
        for info in registry.infos() {
            let Some(source) = info.profile_source.as_deref() else {
                continue;
            };
            let rules = self
                .load_profile_rules(source)
                .await
                .map_err(|e| e.for_url(source))?;
            self.add(source, rules);
        }
        tracing::info!(profiles = self.profiles.len(), "base profiles loaded");
        Ok(())
    }

    /// Rules for one profile URL: the disk cache first, then the network.
    ///
    /// A fresh fetch is written back to the cache.
    ///
    /// # Errors
    ///
    /// Returns fetch, parse and cache-write failures.
    pub async fn load_profile_rules(&self, profile_url: &str) -> Result<RuleSet, ProfileError> {
        if let Some(cache) = &self.cache {
            if let Some(rules) = cache.read(profile_url).await {
                tracing::debug!(profile = profile_url, "profile cache hit");
                return Ok(rules);
            }
            tracing::debug!(profile = profile_url, "profile cache miss");
        }

        let rules = self.fetch(profile_url).await?;

        if let Some(cache) = &self.cache {
            cache.write(profile_url, &rules).await?;
        }
        Ok(rules)
    }

    async fn fetch(&self, profile_url: &str) -> Result<RuleSet, ProfileError> {
        tracing::info!(profile = profile_url, "fetching profile");

        let response = self
            .client
            .get(profile_url)
            .header("Accept", "application/fhir+json, application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(profile = profile_url, error = %e, "profile fetch failed");
                ProfileError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProfileError::Status {
                url: profile_url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let rules = RuleSet::from_structure_definition(&body)?;
        tracing::debug!(
            profile = profile_url,
            resource_type = %rules.resource_type,
            required = rules.required_paths.len(),
            choices = rules.choices.len(),
            "derived profile rules"
        );
        Ok(rules)
    }
}
