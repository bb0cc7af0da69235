//! `_include` and `_include:iterate` expansion.
//!
//! Every outgoing reference is followed regardless of the parameter value.
//! Expansion stops at two levels: level 1 from the primary results, level 2
//! from the level-1 set when `:iterate` is present.

use std::collections::HashSet;
use std::str::FromStr;

use minifhir_core::{Resource, ResourceType, parse_reference};
use minifhir_storage::{FhirStorage, StorageError};

use crate::params::SearchParams;

pub const INCLUDE: &str = "_include";
pub const INCLUDE_ITERATE: &str = "_include:iterate";

/// Maximum number of reference hops followed from the primary results.
pub const MAX_INCLUDE_DEPTH: usize = 2;

/// How far references should be followed for a query.
pub fn include_depth(params: &SearchParams) -> usize {
    if params.contains(INCLUDE_ITERATE) {
        MAX_INCLUDE_DEPTH
    } else if params.contains(INCLUDE) {
        1
    } else {
        0
    }
}

/// Tracks which `Type/id` keys have already been included.
#[derive(Debug, Default)]
pub struct IncludeContext {
    visited: HashSet<(ResourceType, String)>,
}

impl IncludeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a key as included, returning `false` if it already was.
    pub fn mark(&mut self, resource_type: ResourceType, id: &str) -> bool {
        self.visited.insert((resource_type, id.to_string()))
    }

    pub fn is_visited(&self, resource_type: ResourceType, id: &str) -> bool {
        self.visited.contains(&(resource_type, id.to_string()))
    }
}

/// Resolve references from `sources` one level deep.
///
/// Unparseable references, unknown types and missing targets are skipped.
pub async fn expand_level(
    storage: &dyn FhirStorage,
    sources: &[Resource],
    context: &mut IncludeContext,
) -> Result<Vec<Resource>, StorageError> {
    let mut included = Vec::new();
    for source in sources {
        for reference in source.references() {
            let Some(raw) = reference.reference.as_deref() else {
                continue;
            };
            let Ok(target) = parse_reference(raw) else {
                continue;
            };
            let Ok(resource_type) = ResourceType::from_str(&target.resource_type) else {
                continue;
            };
            if context.is_visited(resource_type, &target.id) {
                continue;
            }
            match storage.read(resource_type, &target.id).await {
                Ok(entry) => {
                    context.mark(resource_type, &target.id);
                    included.push(entry.resource);
                }
                Err(e) if e.is_not_found() => {
                    tracing::trace!(reference = raw, "skipping unresolved reference");
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(included)
}

/// Included resources for a page of primary results, level 1 first.
pub async fn expand_includes(
    storage: &dyn FhirStorage,
    primary: &[Resource],
    params: &SearchParams,
) -> Result<Vec<Resource>, StorageError> {
    let depth = include_depth(params);
    if depth == 0 {
        return Ok(Vec::new());
    }

    let mut context = IncludeContext::new();
    let mut included = expand_level(storage, primary, &mut context).await?;
    if depth >= MAX_INCLUDE_DEPTH {
        let second = expand_level(storage, &included, &mut context).await?;
        included.extend(second);
    }
    Ok(included)
}
