//! Startup seed loading from JSON files.
//!
//! Each file matched by the glob holds either one resource or a `Bundle`
//! whose `entry[].resource` items are loaded in order. Seeded resources are
//! upserted. In strict mode the first bad resource aborts the load; in
//! permissive mode bad resources are skipped.

use std::path::PathBuf;

use minifhir_core::{CoreError, Resource};
use minifhir_storage::StorageError;
use minifhir_validation::ValidationError;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::server::AppState;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid seed pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("no seed files match pattern {0}")]
    NoMatches(String),
    #[error("seed path error: {0}")]
    Glob(#[from] glob::GlobError),
    #[error("read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid seed bundle {path}: {source}")]
    Bundle {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Decode(#[from] CoreError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("resource id is required")]
    MissingId,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Counts from a finished seed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub files: usize,
    pub loaded: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct SeedBundle {
    #[serde(default)]
    entry: Vec<SeedBundleEntry>,
}

#[derive(Debug, Deserialize)]
struct SeedBundleEntry {
    #[serde(default)]
    resource: Option<Value>,
}

/// Loads every file matching `pattern` into the store.
///
/// # Errors
///
/// Fails when the pattern is invalid or matches nothing, when a file cannot
/// be read, when a Bundle file is not a valid bundle, and in strict mode on
/// the first resource that fails decoding, validation, the id check or the
/// store write.
pub async fn load_seed(
    pattern: &str,
    strict: bool,
    state: &AppState,
) -> Result<SeedReport, SeedError> {
    let mut matches = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
    if matches.is_empty() {
        return Err(SeedError::NoMatches(pattern.to_string()));
    }
    matches.sort();

    let mut report = SeedReport::default();
    for path in matches {
        let data = tokio::fs::read(&path)
            .await
            .map_err(|source| SeedError::Read {
                path: path.clone(),
                source,
            })?;
        report.files += 1;

        match as_bundle(&data) {
            Some(bundle) => {
                let bundle: SeedBundle = serde_json::from_value(bundle)
                    .map_err(|source| SeedError::Bundle {
                        path: path.clone(),
                        source,
                    })?;
                for entry in bundle.entry {
                    let outcome = match entry.resource {
                        Some(value) => state
                            .registry
                            .decode_value(value)
                            .map_err(SeedError::from),
                        None => Err(CoreError::malformed("bundle entry has no resource").into()),
                    };
                    apply(state, outcome, strict, &mut report).await?;
                }
            }
            None => {
                let outcome = state.registry.decode_resource(&data).map_err(SeedError::from);
                apply(state, outcome, strict, &mut report).await?;
            }
        }
    }
    Ok(report)
}

/// The parsed document when the file's top-level `resourceType` is `Bundle`.
fn as_bundle(data: &[u8]) -> Option<Value> {
    let value: Value = serde_json::from_slice(data).ok()?;
    (value.get("resourceType").and_then(Value::as_str) == Some("Bundle")).then_some(value)
}

async fn apply(
    state: &AppState,
    decoded: Result<Resource, SeedError>,
    strict: bool,
    report: &mut SeedReport,
) -> Result<(), SeedError> {
    match store_resource(state, decoded).await {
        Ok(()) => {
            report.loaded += 1;
            Ok(())
        }
        Err(e) if strict => Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "skipping seed resource");
            report.skipped += 1;
            Ok(())
        }
    }
}

async fn store_resource(
    state: &AppState,
    decoded: Result<Resource, SeedError>,
) -> Result<(), SeedError> {
    let resource = decoded?;
    state.validator.validate(&resource, None)?;
    if resource.id().is_none() {
        return Err(SeedError::MissingId);
    }
    state.storage.update(resource).await?;
    Ok(())
}
