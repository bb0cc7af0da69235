//! Batch and transaction processing.
//!
//! Both bundle types get the same treatment: entries run independently in
//! input order and a failed entry never affects its siblings. There is no
//! rollback.

use axum::http::StatusCode;
use minifhir_api::{ApiError, Bundle, BundleEntry, BundleRequest};
use serde_json::Value;

use crate::server::AppState;

pub async fn process_batch(state: &AppState, request: BundleRequest) -> Bundle {
    let mut entries = Vec::with_capacity(request.entry.len());
    for (index, entry) in request.entry.into_iter().enumerate() {
        let status = match entry.resource {
            Some(resource) => match process_entry(state, resource).await {
                Ok(()) => StatusCode::OK,
                Err(e) => {
                    tracing::debug!(index, error = %e, "batch entry failed");
                    StatusCode::BAD_REQUEST
                }
            },
            None => StatusCode::BAD_REQUEST,
        };
        entries.push(BundleEntry::status(status));
    }
    Bundle::batch_response(entries)
}

/// Decode, validate and upsert a single entry.
async fn process_entry(state: &AppState, value: Value) -> Result<(), ApiError> {
    let resource = state.registry.decode_value(value)?;
    state.validator.validate(&resource, None)?;
    state.storage.update(resource).await?;
    Ok(())
}
