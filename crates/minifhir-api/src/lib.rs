use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use minifhir_core::{CoreError, ErrorCategory, Resource};
use minifhir_search::{SearchEntryMode, SearchError, SearchResult};
use minifhir_storage::StorageError;
use minifhir_validation::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

pub const FHIR_JSON: &str = "application/fhir+json";

fn fhir_json_response(status: StatusCode, body: Vec<u8>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(FHIR_JSON))],
        body,
    )
        .into_response()
}

fn serialization_fallback() -> Vec<u8> {
    let fallback = OperationOutcome::single("fatal", "exception", "Serialization failure");
    serde_json::to_vec(&fallback).unwrap_or_else(|_| b"{}".to_vec())
}

// -------------------------
// OperationOutcome
// -------------------------

/// Minimal FHIR OperationOutcome, the uniform envelope for failures and
/// `$validate` results.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OperationOutcome {
    #[serde(rename = "resourceType")]
    pub resource_type: &'static str, // always "OperationOutcome"
    pub issue: Vec<OperationOutcomeIssue>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OperationOutcomeIssue {
    /// FHIR issue severity: fatal | error | warning | information
    pub severity: &'static str,
    /// FHIR issue type code (subset used): invalid | required | not-found | conflict | informational | exception
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl OperationOutcome {
    pub fn single(
        severity: &'static str,
        code: &'static str,
        diagnostics: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: "OperationOutcome",
            issue: vec![OperationOutcomeIssue {
                severity,
                code,
                diagnostics: Some(diagnostics.into()),
            }],
        }
    }

    /// Informational outcome returned by a successful `$validate`.
    pub fn information(diagnostics: impl Into<String>) -> Self {
        Self::single("information", "informational", diagnostics)
    }
}

// -------------------------
// ApiError
// -------------------------

/// Request failures mapped to HTTP status codes and an OperationOutcome body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Required: {0}")]
    Required(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn required(msg: impl Into<String>) -> Self {
        Self::Required(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn unprocessable_entity(msg: impl Into<String>) -> Self {
        Self::UnprocessableEntity(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Required(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_operation_outcome(&self) -> OperationOutcome {
        match self {
            ApiError::BadRequest(msg) => OperationOutcome::single("error", "invalid", msg),
            ApiError::Required(msg) => OperationOutcome::single("error", "required", msg),
            ApiError::NotFound(msg) => OperationOutcome::single("error", "not-found", msg),
            ApiError::Conflict(msg) => OperationOutcome::single("error", "conflict", msg),
            ApiError::UnprocessableEntity(msg) => {
                OperationOutcome::single("error", "invalid", msg)
            }
            ApiError::Internal(msg) => OperationOutcome::single("fatal", "exception", msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::to_vec(&self.to_operation_outcome())
            .unwrap_or_else(|_| serialization_fallback());
        fhir_json_response(self.status_code(), body)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingId => Self::Required(err.to_string()),
            _ if err.is_client_error() => Self::BadRequest(err.to_string()),
            _ => Self::Internal(err.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MissingId => Self::Required(err.to_string()),
            StorageError::NotFound { .. } => Self::NotFound(err.to_string()),
            StorageError::AlreadyExists { .. } => Self::Conflict(err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Core(core) if core.category() == ErrorCategory::Serialization => {
                Self::Internal(core.to_string())
            }
            other => Self::UnprocessableEntity(other.to_string()),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::UnsupportedType(_) => Self::NotFound("resource type not supported".into()),
            SearchError::InvalidCount(_) => Self::BadRequest(err.to_string()),
            SearchError::Storage(storage) => storage.into(),
        }
    }
}

// -------------------------
// API Response Wrapper
// -------------------------

/// A serializable body with a status, rendered as `application/fhir+json`.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub value: T,
    pub status: StatusCode,
}

impl<T> ApiResponse<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self { value, status }
    }

    pub fn ok(value: T) -> Self {
        Self::new(value, StatusCode::OK)
    }

    pub fn created(value: T) -> Self {
        Self::new(value, StatusCode::CREATED)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = serde_json::to_vec(&self.value).unwrap_or_else(|_| serialization_fallback());
        fhir_json_response(self.status, body)
    }
}

// -------------------------
// FHIR Bundle Types
// -------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<BundleEntrySearch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<BundleEntryResponse>,
}

impl BundleEntry {
    pub fn resource(resource: &Resource) -> Result<Self, ApiError> {
        Ok(Self {
            resource: Some(resource.to_value()?),
            search: None,
            response: None,
        })
    }

    #[must_use]
    pub fn with_search_mode(mut self, mode: SearchEntryMode) -> Self {
        self.search = Some(BundleEntrySearch {
            mode: mode.as_str().to_string(),
        });
        self
    }

    /// Batch-response entry carrying only a status code.
    pub fn status(status: StatusCode) -> Self {
        Self {
            resource: None,
            search: None,
            response: Some(BundleEntryResponse {
                status: status.as_u16().to_string(),
            }),
        }
    }
}

/// Search component of a Bundle entry: "match" or "include".
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BundleEntrySearch {
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BundleEntryResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    pub resource_type: &'static str,
    #[serde(rename = "type")]
    pub bundle_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    pub fn searchset(total: u64, entries: Vec<BundleEntry>) -> Self {
        Self {
            resource_type: "Bundle",
            bundle_type: "searchset".to_string(),
            total: Some(total),
            entry: entries,
        }
    }

    pub fn batch_response(entries: Vec<BundleEntry>) -> Self {
        Self {
            resource_type: "Bundle",
            bundle_type: "batch-response".to_string(),
            total: None,
            entry: entries,
        }
    }

    /// Searchset of resource snapshots, as returned by history endpoints.
    pub fn from_resources(resources: &[Resource]) -> Result<Self, ApiError> {
        let entries = resources
            .iter()
            .map(BundleEntry::resource)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::searchset(resources.len() as u64, entries))
    }

    /// Searchset for a search result: matches first, then includes.
    ///
    /// `total` counts matches before `_count` truncation, never includes.
    pub fn from_search(result: &SearchResult) -> Result<Self, ApiError> {
        let entries = result
            .tagged()
            .map(|(resource, mode)| Ok(BundleEntry::resource(resource)?.with_search_mode(mode)))
            .collect::<Result<Vec<_>, ApiError>>()?;
        Ok(Self::searchset(result.total as u64, entries))
    }
}

/// Incoming batch/transaction payload. Entries keep their resource as raw
/// JSON so each one can be decoded independently.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleRequest {
    #[serde(rename = "resourceType", default)]
    pub resource_type: String,
    #[serde(rename = "type", default)]
    pub bundle_type: Option<String>,
    #[serde(default)]
    pub entry: Vec<BundleRequestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleRequestEntry {
    #[serde(default)]
    pub resource: Option<JsonValue>,
}

impl BundleRequest {
    pub fn is_bundle(&self) -> bool {
        self.resource_type == "Bundle"
    }
}

// -------------------------
// CapabilityStatement Types
// -------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CapabilityStatement {
    #[serde(rename = "resourceType")]
    pub resource_type: &'static str, // always "CapabilityStatement"
    pub status: String,
    #[serde(rename = "fhirVersion")]
    pub fhir_version: String,
    pub format: Vec<String>,
    pub rest: Vec<CapabilityStatementRest>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CapabilityStatementRest {
    pub mode: String, // "server" or "client"
    pub resource: Vec<CapabilityStatementRestResource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interaction: Vec<Interaction>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CapabilityStatementRestResource {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interaction: Vec<Interaction>,
    #[serde(rename = "searchParam", skip_serializing_if = "Vec::is_empty")]
    pub search_param: Vec<SearchParam>,
}

impl CapabilityStatementRestResource {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_: type_name.into(),
            interaction: Vec::new(),
            search_param: Vec::new(),
        }
    }

    pub fn with_interactions(mut self, codes: &[&str]) -> Self {
        self.interaction = codes.iter().map(|c| Interaction::new(*c)).collect();
        self
    }

    pub fn with_search_params(mut self, names: &[&str]) -> Self {
        self.search_param = names
            .iter()
            .map(|name| SearchParam {
                name: name.to_string(),
            })
            .collect();
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Interaction {
    pub code: String, // e.g., "read", "search-type", "batch"
}

impl Interaction {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchParam {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CapabilityStatementBuilder {
    status: String,
    fhir_version: String,
    formats: Vec<String>,
    resources: Vec<CapabilityStatementRestResource>,
    interactions: Vec<Interaction>,
}

impl CapabilityStatementBuilder {
    pub fn new_json_stu3() -> Self {
        Self {
            status: "active".to_string(),
            fhir_version: "3.0.2".to_string(),
            formats: vec!["json".to_string()],
            resources: Vec::new(),
            interactions: Vec::new(),
        }
    }

    pub fn add_resource(mut self, resource: CapabilityStatementRestResource) -> Self {
        self.resources.push(resource);
        self
    }

    /// System-level interaction, e.g. `batch`.
    pub fn add_interaction(mut self, code: impl Into<String>) -> Self {
        self.interactions.push(Interaction::new(code));
        self
    }

    pub fn build(self) -> CapabilityStatement {
        CapabilityStatement {
            resource_type: "CapabilityStatement",
            status: self.status,
            fhir_version: self.fhir_version,
            format: self.formats,
            rest: vec![CapabilityStatementRest {
                mode: "server".to_string(),
                resource: self.resources,
                interaction: self.interactions,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minifhir_core::ResourceType;

    #[test]
    fn into_response_sets_status_and_content_type() {
        let resp = ApiError::bad_request("Invalid parameter").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap();
        assert_eq!(content_type, &HeaderValue::from_static(FHIR_JSON));
    }

    #[test]
    fn operation_outcome_shape() {
        let outcome = ApiError::not_found("Patient/123 not found").to_operation_outcome();
        let j = serde_json::to_value(&outcome).unwrap();
        assert_eq!(j["resourceType"], "OperationOutcome");
        assert_eq!(j["issue"][0]["severity"], "error");
        assert_eq!(j["issue"][0]["code"], "not-found");
        assert_eq!(j["issue"][0]["diagnostics"], "Patient/123 not found");
        let info = serde_json::to_value(OperationOutcome::information("validation succeeded")).unwrap();
        assert_eq!(info["issue"][0]["severity"], "information");
        assert_eq!(info["issue"][0]["code"], "informational");
    }

    #[test]
    fn api_error_variants_map_to_status_and_codes() {
        let cases: Vec<(ApiError, StatusCode, &str)> = vec![
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST, "invalid"),
            (ApiError::required("x"), StatusCode::BAD_REQUEST, "required"),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND, "not-found"),
            (ApiError::conflict("x"), StatusCode::CONFLICT, "conflict"),
            (
                ApiError::unprocessable_entity("x"),
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid",
            ),
            (
                ApiError::internal("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
                "exception",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.to_operation_outcome().issue[0].code, code);
        }
    }

    #[test]
    fn domain_errors_convert_by_kind() {
        let decode: ApiError = CoreError::unknown_field("Patient", "unknownField").into();
        assert_eq!(decode.status_code(), StatusCode::BAD_REQUEST);
        let mismatch: ApiError = CoreError::type_mismatch("Patient", "Observation").into();
        assert_eq!(mismatch.to_operation_outcome().issue[0].code, "invalid");
        let no_body_id: ApiError = CoreError::MissingId.into();
        assert_eq!(no_body_id.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(no_body_id.to_operation_outcome().issue[0].code, "required");
        let broken: ApiError = CoreError::from(
            serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        )
        .into();
        assert_eq!(broken.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let missing: ApiError = StorageError::not_found("Patient", "p1").into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        let duplicate: ApiError = StorageError::already_exists("Patient", "p1").into();
        assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);
        let no_id: ApiError = StorageError::MissingId.into();
        assert_eq!(no_id.status_code(), StatusCode::BAD_REQUEST);

        let invalid: ApiError =
            ValidationError::MissingRequired(vec!["Patient.gender".into()]).into();
        assert_eq!(invalid.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let diagnostics = invalid.to_operation_outcome().issue[0]
            .diagnostics
            .clone()
            .unwrap();
        assert!(diagnostics.contains("Patient.gender"));

        let unknown_type: ApiError = SearchError::UnsupportedType("Encounter".into()).into();
        assert_eq!(unknown_type.status_code(), StatusCode::NOT_FOUND);
        let bad_count: ApiError = SearchError::InvalidCount("abc".into()).into();
        assert_eq!(bad_count.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_response_sets_status_and_content_type() {
        let resp = ApiResponse::created(serde_json::json!({"resourceType": "Patient"}))
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            &HeaderValue::from_static(FHIR_JSON)
        );
    }

    #[test]
    fn search_bundle_tags_entries_and_counts_matches_only() {
        let mut patient = Resource::new(ResourceType::Patient);
        patient.set_id("pat-1");
        let mut org = Resource::new(ResourceType::Organization);
        org.set_id("org-1");
        let result = SearchResult {
            entries: vec![patient],
            included: vec![org],
            total: 3,
        };

        let j = serde_json::to_value(Bundle::from_search(&result).unwrap()).unwrap();
        assert_eq!(j["resourceType"], "Bundle");
        assert_eq!(j["type"], "searchset");
        assert_eq!(j["total"], 3);
        assert_eq!(j["entry"][0]["resource"]["id"], "pat-1");
        assert_eq!(j["entry"][0]["search"]["mode"], "match");
        assert_eq!(j["entry"][1]["resource"]["resourceType"], "Organization");
        assert_eq!(j["entry"][1]["search"]["mode"], "include");
    }

    #[test]
    fn batch_response_entries_carry_status_only() {
        let bundle = Bundle::batch_response(vec![
            BundleEntry::status(StatusCode::OK),
            BundleEntry::status(StatusCode::BAD_REQUEST),
        ]);
        let j = serde_json::to_value(&bundle).unwrap();
        assert_eq!(j["type"], "batch-response");
        assert!(j.get("total").is_none());
        assert_eq!(j["entry"][0]["response"]["status"], "200");
        assert_eq!(j["entry"][1]["response"]["status"], "400");
        assert!(j["entry"][1].get("resource").is_none());
    }

    #[test]
    fn bundle_request_tolerates_missing_parts() {
        let request: BundleRequest = serde_json::from_value(serde_json::json!({
            "resourceType": "Bundle",
            "type": "transaction",
            "entry": [{"resource": {"resourceType": "Patient", "id": "p1"}}, {"request": {"method": "PUT"}}]
        }))
        .unwrap();
        assert!(request.is_bundle());
        assert_eq!(request.entry.len(), 2);
        assert!(request.entry[1].resource.is_none());

        let other: BundleRequest =
            serde_json::from_value(serde_json::json!({"resourceType": "Patient"})).unwrap();
        assert!(!other.is_bundle());
    }

    #[test]
    fn build_capability_statement() {
        let cs = CapabilityStatementBuilder::new_json_stu3()
            .add_resource(
                CapabilityStatementRestResource::new("Patient")
                    .with_interactions(&["read", "search-type"])
                    .with_search_params(&["_count"]),
            )
            .add_interaction("batch")
            .build();
        let j = serde_json::to_value(&cs).unwrap();
        assert_eq!(j["resourceType"], "CapabilityStatement");
        assert_eq!(j["status"], "active");
        assert_eq!(j["fhirVersion"], "3.0.2");
        assert_eq!(j["format"][0], "json");
        assert_eq!(j["rest"][0]["mode"], "server");
        assert_eq!(j["rest"][0]["interaction"][0]["code"], "batch");
        assert_eq!(j["rest"][0]["resource"][0]["type"], "Patient");
        assert_eq!(j["rest"][0]["resource"][0]["interaction"][1]["code"], "search-type");
        assert_eq!(j["rest"][0]["resource"][0]["searchParam"][0]["name"], "_count");
    }
}
