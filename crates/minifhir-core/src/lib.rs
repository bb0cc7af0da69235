//! Core types for the MiniFHIR server: the resource model, the resource
//! registry, reference parsing and timestamps.

pub mod error;
pub mod fhir_reference;
pub mod registry;
pub mod resource;
pub mod time;

pub use error::{CoreError, ErrorCategory, Result};
pub use fhir_reference::{FhirReference, parse_reference};
pub use registry::{ResourceInfo, ResourceRegistry};
pub use resource::{DomainResource, Meta, Reference, Resource, ResourceType};
pub use time::{FhirInstant, now_utc};
