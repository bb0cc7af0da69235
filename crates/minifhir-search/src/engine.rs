use std::sync::Arc;

use minifhir_core::{Resource, ResourceRegistry};
use minifhir_storage::{DynStorage, StorageError};
use thiserror::Error;

use crate::include::expand_includes;
use crate::params::SearchParams;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("unsupported resource type: {0}")]
    UnsupportedType(String),
    #[error("invalid _count value: {0}")]
    InvalidCount(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Whether a result entry matched the query or was pulled in by `_include`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEntryMode {
    Match,
    Include,
}

impl SearchEntryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Include => "include",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// Matching resources after sorting and `_count`.
    pub entries: Vec<Resource>,
    /// Referenced resources, level 1 before level 2.
    pub included: Vec<Resource>,
    /// Number of matches before `_count` truncation.
    pub total: usize,
}

impl SearchResult {
    /// Primary entries followed by included entries, each tagged.
    pub fn tagged(&self) -> impl Iterator<Item = (&Resource, SearchEntryMode)> {
        self.entries
            .iter()
            .map(|r| (r, SearchEntryMode::Match))
            .chain(self.included.iter().map(|r| (r, SearchEntryMode::Include)))
    }
}

/// Evaluates type-level searches against the store.
#[derive(Clone)]
pub struct SearchEngine {
    registry: Arc<ResourceRegistry>,
    storage: DynStorage,
}

impl SearchEngine {
    pub fn new(registry: Arc<ResourceRegistry>, storage: DynStorage) -> Self {
        Self { registry, storage }
    }

    /// Runs a search over one resource type.
    ///
    /// Supported parameters: `_profile`, `_sort`, `_count`, `_include` and
    /// `_include:iterate`. Anything else is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::UnsupportedType`] for unregistered types and
    /// [`SearchError::InvalidCount`] for a non-numeric or negative `_count`.
    pub async fn search(
        &self,
        resource_type: &str,
        params: &SearchParams,
    ) -> Result<SearchResult, SearchError> {
        let info = self
            .registry
            .info(resource_type)
            .ok_or_else(|| SearchError::UnsupportedType(resource_type.to_string()))?;

        let mut entries = self.storage.list(info.resource_type).await?;

        if let Some(profile) = params.get("_profile") {
            entries.retain(|r| r.profiles().iter().any(|p| p == profile));
        }
        if let Some(sort) = params.get("_sort") {
            entries = sort_entries(entries, sort);
        }

        let total = entries.len();
        if let Some(count) = params.get("_count") {
            entries.truncate(parse_count(count)?);
        }

        let included = expand_includes(self.storage.as_ref(), &entries, params).await?;

        tracing::debug!(
            resource_type,
            total,
            returned = entries.len(),
            included = included.len(),
            "search evaluated"
        );
        Ok(SearchResult {
            entries,
            included,
            total,
        })
    }
}

/// Leading integer of a `_count` value.
fn parse_count(raw: &str) -> Result<usize, SearchError> {
    let trimmed = raw.trim_start();
    let digits_end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(trimmed.len(), |(i, _)| i);
    let parsed: i64 = trimmed[..digits_end]
        .parse()
        .map_err(|_| SearchError::InvalidCount(raw.to_string()))?;
    usize::try_from(parsed).map_err(|_| SearchError::InvalidCount(raw.to_string()))
}

/// Stable sort on the first `_sort` key; `-` prefix means descending.
fn sort_entries(entries: Vec<Resource>, sort: &str) -> Vec<Resource> {
    let field = sort.split(',').next().unwrap_or_default().trim();
    if field.is_empty() {
        return entries;
    }
    let (field, descending) = match field.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (field, false),
    };

    let mut keyed: Vec<(String, Resource)> = entries
        .into_iter()
        .map(|r| (sort_value(&r, field), r))
        .collect();
    keyed.sort_by(|(left, _), (right, _)| {
        let ordering = left.cmp(right);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    keyed.into_iter().map(|(_, r)| r).collect()
}

fn sort_value(resource: &Resource, field: &str) -> String {
    let value = match field {
        "_lastUpdated" => resource.meta().and_then(|m| m.last_updated.as_deref()),
        "id" => resource.id(),
        "date" => match resource {
            Resource::Observation(obs) => obs.effective_date(),
            _ => None,
        },
        _ => None,
    };
    value.unwrap_or_default().to_string()
}
