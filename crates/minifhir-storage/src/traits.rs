//! The storage contract implemented by every backend.

use async_trait::async_trait;
use minifhir_core::{Resource, ResourceType};

use crate::StorageResult;
use crate::types::ResourceEntry;

/// Versioned resource storage keyed by `(type, id)`.
///
/// Resources are moved in and copies are handed out, so callers never alias
/// stored state. Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait FhirStorage: Send + Sync {
    /// Inserts a new resource at version 1.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingId` if the resource has no id.
    /// Returns `StorageError::AlreadyExists` if the key is taken.
    async fn create(&self, resource: Resource) -> StorageResult<ResourceEntry>;

    /// Upserts a resource.
    ///
    /// An absent key behaves like [`FhirStorage::create`]. Otherwise the
    /// current resource moves to history and the version increments by one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingId` if the resource has no id.
    async fn update(&self, resource: Resource) -> StorageResult<ResourceEntry>;

    /// Removes a resource together with its history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the resource does not exist.
    async fn delete(&self, resource_type: ResourceType, id: &str) -> StorageResult<()>;

    /// Reads the entry for a key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the resource does not exist.
    async fn read(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> StorageResult<ResourceEntry>;

    /// All current resources of a type, ordered by ascending id.
    async fn list(&self, resource_type: ResourceType) -> StorageResult<Vec<Resource>>;

    /// Superseded snapshots of one resource, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the resource does not exist.
    async fn history(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> StorageResult<Vec<Resource>>;

    /// Every current resource across all types, in no particular order.
    async fn system_history(&self) -> StorageResult<Vec<Resource>>;
}
