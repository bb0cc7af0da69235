use std::sync::Arc;

use minifhir_core::{Resource, ResourceRegistry};

use crate::error::ValidationError;
use crate::profile_store::ProfileStore;
use crate::required::missing_required;
use crate::rules::RuleSet;

/// Applies loaded profile rules to resources.
///
/// Holds no locks; the registry and profile table are read-only once built.
#[derive(Debug, Clone)]
pub struct Validator {
    registry: Arc<ResourceRegistry>,
    profiles: Arc<ProfileStore>,
}

impl Validator {
    pub fn new(registry: Arc<ResourceRegistry>, profiles: Arc<ProfileStore>) -> Self {
        Self { registry, profiles }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Validates a resource against an optional requested profile and then
    /// against its type's base profile.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::UnsupportedType`] for unregistered types
    /// - [`ValidationError::InvalidMeta`] when `meta.profile` has a blank entry
    /// - [`ValidationError::ProfileNotLoaded`] when a profile is blank or unknown
    /// - [`ValidationError::MissingRequired`] listing every missing path of the
    ///   first profile that fails
    pub fn validate(&self, resource: &Resource, profile: Option<&str>) -> Result<(), ValidationError> {
        let resource_type = resource.resource_type();
        let info = self
            .registry
            .info(resource_type.as_str())
            .ok_or_else(|| ValidationError::UnsupportedType(resource_type.to_string()))?;

        if resource.profiles().iter().any(|p| p.trim().is_empty()) {
            return Err(ValidationError::InvalidMeta);
        }

        if let Some(profile) = profile {
            self.apply_profile(resource, profile)?;
        }

        if let Some(base) = info.profile_source.as_deref() {
            self.apply_profile(resource, base)?;
        }

        Ok(())
    }

    fn apply_profile(&self, resource: &Resource, profile_url: &str) -> Result<(), ValidationError> {
        let rules = self.rules_for(profile_url)?;
        let tree = resource.to_value()?;
        let missing = missing_required(&tree, rules);
        if missing.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            resource_type = %resource.resource_type(),
            profile = profile_url,
            missing = missing.len(),
            "resource failed profile rules"
        );
        Err(ValidationError::MissingRequired(missing))
    }

    fn rules_for(&self, profile_url: &str) -> Result<&RuleSet, ValidationError> {
        if profile_url.trim().is_empty() {
            return Err(ValidationError::ProfileNotLoaded(profile_url.to_string()));
        }
        self.profiles
            .get(profile_url)
            .ok_or_else(|| ValidationError::ProfileNotLoaded(profile_url.to_string()))
    }
}
