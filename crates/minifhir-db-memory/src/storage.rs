use std::collections::{BTreeMap, HashMap, btree_map::Entry};

use async_trait::async_trait;
use minifhir_core::{FhirInstant, Meta, Resource, ResourceType, now_utc};
use minifhir_storage::{FhirStorage, ResourceEntry, StorageError, StorageResult};
use tokio::sync::RwLock;

/// Ids of one resource type, kept ordered so listing is deterministic.
type TypeSpace = BTreeMap<String, ResourceEntry>;

/// In-memory FHIR storage backend.
///
/// The whole two-level keyspace (type, then id) sits behind a single
/// reader/writer lock. Writers exclude everyone, readers share. Nothing
/// awaits while the lock is held, and every value crossing it is cloned.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    data: RwLock<HashMap<ResourceType, TypeSpace>>,
}

impl InMemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn required_id(resource: &Resource) -> StorageResult<String> {
    resource
        .id()
        .map(str::to_owned)
        .ok_or(StorageError::MissingId)
}

/// Writes version and timestamp into `meta`, keeping declared profiles.
fn stamp_meta(resource: &mut Resource, version: u64, now: FhirInstant) {
    let meta = resource.meta_mut().get_or_insert_with(Meta::default);
    meta.version_id = Some(version.to_string());
    meta.last_updated = Some(now.to_string());
}

fn new_entry(mut resource: Resource, now: FhirInstant) -> ResourceEntry {
    stamp_meta(&mut resource, 1, now);
    ResourceEntry {
        resource,
        version: 1,
        last_updated: now,
        history: Vec::new(),
    }
}

#[async_trait]
impl FhirStorage for InMemoryStorage {
    async fn create(&self, resource: Resource) -> StorageResult<ResourceEntry> {
        let id = required_id(&resource)?;
        let resource_type = resource.resource_type();
        let now = now_utc();

        let mut data = self.data.write().await;
        match data.entry(resource_type).or_default().entry(id) {
            Entry::Occupied(slot) => Err(StorageError::already_exists(
                resource_type.as_str(),
                slot.key().as_str(),
            )),
            Entry::Vacant(slot) => {
                tracing::debug!(%resource_type, id = %slot.key(), "created resource");
                Ok(slot.insert(new_entry(resource, now)).clone())
            }
        }
    }

    async fn update(&self, mut resource: Resource) -> StorageResult<ResourceEntry> {
        let id = required_id(&resource)?;
        let resource_type = resource.resource_type();
        let now = now_utc();

        let mut data = self.data.write().await;
        let entry = match data.entry(resource_type).or_default().entry(id) {
            Entry::Vacant(slot) => slot.insert(new_entry(resource, now)).clone(),
            Entry::Occupied(mut slot) => {
                let stored = slot.get_mut();
                let version = stored.history.len() as u64 + 2;
                stamp_meta(&mut resource, version, now);
                let previous = std::mem::replace(&mut stored.resource, resource);
                stored.history.push(previous);
                stored.version = version;
                stored.last_updated = now;
                stored.clone()
            }
        };
        drop(data);

        tracing::debug!(
            %resource_type,
            id = entry.resource.id().unwrap_or_default(),
            version = entry.version,
            "updated resource"
        );
        Ok(entry)
    }

    async fn delete(&self, resource_type: ResourceType, id: &str) -> StorageResult<()> {
        let mut data = self.data.write().await;
        data.get_mut(&resource_type)
            .and_then(|space| space.remove(id))
            .ok_or_else(|| StorageError::not_found(resource_type.as_str(), id))?;
        drop(data);

        tracing::debug!(%resource_type, id, "deleted resource");
        Ok(())
    }

    async fn read(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> StorageResult<ResourceEntry> {
        let data = self.data.read().await;
        data.get(&resource_type)
            .and_then(|space| space.get(id))
            .cloned()
            .ok_or_else(|| StorageError::not_found(resource_type.as_str(), id))
    }

    async fn list(&self, resource_type: ResourceType) -> StorageResult<Vec<Resource>> {
        let data = self.data.read().await;
        Ok(data
            .get(&resource_type)
            .map(|space| space.values().map(|e| e.resource.clone()).collect())
            .unwrap_or_default())
    }

    async fn history(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> StorageResult<Vec<Resource>> {
        let data = self.data.read().await;
        data.get(&resource_type)
            .and_then(|space| space.get(id))
            .map(|entry| entry.history.clone())
            .ok_or_else(|| StorageError::not_found(resource_type.as_str(), id))
    }

    async fn system_history(&self) -> StorageResult<Vec<Resource>> {
        let data = self.data.read().await;
        Ok(data
            .values()
            .flat_map(|space| space.values().map(|e| e.resource.clone()))
            .collect())
    }
}
