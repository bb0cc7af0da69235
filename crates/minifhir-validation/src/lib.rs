//! Profile-driven validation for the MiniFHIR server.
//!
//! Profiles (StructureDefinition documents) are fetched over HTTP, reduced to
//! [`RuleSet`]s of required paths and choice groups, cached on disk and then
//! applied to resources by the [`Validator`].

pub mod cache;
pub mod error;
pub mod profile_store;
pub mod required;
pub mod rules;
pub mod validator;

pub use cache::{CACHE_VERSION, ProfileCache};
pub use error::{ProfileError, ValidationError};
pub use profile_store::{ProfileStore, ProfileStoreConfig};
pub use required::missing_required;
pub use rules::{ChoiceRule, RuleSet};
pub use validator::Validator;
