//! In-memory FHIR storage backend for the MiniFHIR server.
//!
//! This crate provides an in-memory implementation of the `FhirStorage` trait
//! from `minifhir-storage`. State does not survive a restart.
//!
//! # Example
//!
//! ```ignore
//! use minifhir_core::{Resource, resource::Patient};
//! use minifhir_db_memory::InMemoryStorage;
//! use minifhir_storage::FhirStorage;
//!
//! let storage = InMemoryStorage::new();
//! let patient = Patient { id: Some("pat-1".into()), ..Default::default() };
//! let entry = storage.create(Resource::from(patient)).await?;
//! assert_eq!(entry.version, 1);
//! ```

pub mod storage;

pub use minifhir_storage::{DynStorage, FhirStorage, ResourceEntry, StorageError};
pub use storage::InMemoryStorage;

/// Creates a new in-memory FhirStorage instance.
pub fn create_fhir_storage() -> DynStorage {
    std::sync::Arc::new(InMemoryStorage::new())
}
