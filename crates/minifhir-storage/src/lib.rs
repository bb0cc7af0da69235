//! # minifhir-storage
//!
//! Storage abstraction layer for the MiniFHIR server.
//!
//! This crate defines the [`FhirStorage`] trait and the [`ResourceEntry`] it
//! hands out. Backends live in separate crates.
//!
//! ## Example
//!
//! ```ignore
//! use minifhir_core::ResourceType;
//! use minifhir_storage::{FhirStorage, StorageResult};
//!
//! async fn patient_version(storage: &dyn FhirStorage, id: &str) -> StorageResult<u64> {
//!     let entry = storage.read(ResourceType::Patient, id).await?;
//!     Ok(entry.version)
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::StorageError;
pub use traits::FhirStorage;
pub use types::ResourceEntry;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynStorage = std::sync::Arc<dyn FhirStorage>;
