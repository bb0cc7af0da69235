//! Types shared between storage backends and their callers.

use minifhir_core::{FhirInstant, Resource, ResourceType};
use serde::Serialize;

/// The unit of storage for one `(type, id)` key.
///
/// Values handed out by a backend are independent copies; mutating them never
/// affects stored state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    /// Current resource, with `meta.versionId` and `meta.lastUpdated` stamped.
    pub resource: Resource,
    /// Current version, starting at 1.
    pub version: u64,
    /// Time of the last create or update.
    pub last_updated: FhirInstant,
    /// Superseded snapshots, oldest first. Always `version - 1` long.
    pub history: Vec<Resource>,
}

impl ResourceEntry {
    pub fn resource_type(&self) -> ResourceType {
        self.resource.resource_type()
    }

    /// Version as carried in `meta.versionId`.
    pub fn version_id(&self) -> String {
        self.version.to_string()
    }
}
