use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
};
use minifhir_api::{
    ApiError, ApiResponse, Bundle, BundleRequest, CapabilityStatement, OperationOutcome,
};
use minifhir_core::{CoreError, Resource, ResourceType};
use minifhir_search::SearchParams;
use serde::Deserialize;

use crate::{batch, capability, server::AppState};

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

fn resolve_type(state: &AppState, resource_type: &str) -> Result<ResourceType, ApiError> {
    state
        .registry
        .info(resource_type)
        .map(|info| info.resource_type)
        .ok_or_else(|| ApiError::not_found(format!("resource type not supported: {resource_type}")))
}

fn ensure_path_type(resource: &Resource, resource_type: &str) -> Result<(), CoreError> {
    let declared = resource.resource_type().as_str();
    if declared != resource_type {
        return Err(CoreError::type_mismatch(resource_type, declared));
    }
    Ok(())
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn metadata(State(state): State<AppState>) -> ApiResponse<CapabilityStatement> {
    ApiResponse::ok(capability::capability_statement(&state.registry))
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateParams {
    #[serde(default)]
    pub profile: Option<String>,
}

/// `POST /$validate` and `POST /{type}/$validate`.
pub async fn validate_resource(
    State(state): State<AppState>,
    Query(params): Query<ValidateParams>,
    body: Bytes,
) -> ApiResult<OperationOutcome> {
    let resource = state.registry.decode_resource(&body)?;
    let profile = params.profile.as_deref().filter(|p| !p.is_empty());
    state.validator.validate(&resource, profile)?;
    Ok(ApiResponse::ok(OperationOutcome::information(
        "validation succeeded",
    )))
}

pub async fn create_resource(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    body: Bytes,
) -> ApiResult<Resource> {
    let resource = state.registry.decode_resource(&body)?;
    ensure_path_type(&resource, &resource_type)?;
    if resource.id().is_none() {
        return Err(CoreError::MissingId.into());
    }
    state.validator.validate(&resource, None)?;
    let entry = state.storage.create(resource).await?;
    tracing::info!(
        resource_type = %resource_type,
        id = entry.resource.id().unwrap_or_default(),
        "resource created"
    );
    Ok(ApiResponse::created(entry.resource))
}

pub async fn read_resource(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
) -> ApiResult<Resource> {
    let resource_type = resolve_type(&state, &resource_type)?;
    let entry = state.storage.read(resource_type, &id).await?;
    Ok(ApiResponse::ok(entry.resource))
}

/// Upsert; the id in the path replaces any id in the body.
pub async fn update_resource(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Resource> {
    let mut resource = state.registry.decode_resource(&body)?;
    ensure_path_type(&resource, &resource_type)?;
    resource.set_id(id);
    state.validator.validate(&resource, None)?;
    let entry = state.storage.update(resource).await?;
    tracing::info!(
        resource_type = %resource_type,
        id = entry.resource.id().unwrap_or_default(),
        version = entry.version,
        "resource updated"
    );
    Ok(ApiResponse::ok(entry.resource))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let resource_type = resolve_type(&state, &resource_type)?;
    state.storage.delete(resource_type, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn resource_history(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
) -> ApiResult<Bundle> {
    let resource_type = resolve_type(&state, &resource_type)?;
    let snapshots = state.storage.history(resource_type, &id).await?;
    Ok(ApiResponse::ok(Bundle::from_resources(&snapshots)?))
}

pub async fn system_history(State(state): State<AppState>) -> ApiResult<Bundle> {
    let snapshots = state.storage.system_history().await?;
    Ok(ApiResponse::ok(Bundle::from_resources(&snapshots)?))
}

pub async fn search_resources(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Bundle> {
    let params = SearchParams::parse(query.as_deref().unwrap_or_default());
    let result = state.search.search(&resource_type, &params).await?;
    Ok(ApiResponse::ok(Bundle::from_search(&result)?))
}

/// `POST /` for both batch and transaction bundles.
pub async fn batch(State(state): State<AppState>, body: Bytes) -> ApiResult<Bundle> {
    let request: BundleRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if !request.is_bundle() {
        return Err(ApiError::bad_request("expected Bundle"));
    }
    Ok(ApiResponse::ok(batch::process_batch(&state, request).await))
}
