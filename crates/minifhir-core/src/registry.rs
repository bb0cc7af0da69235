//! Resource registry: the fixed table of supported resource types.
//!
//! Built once at startup and shared read-only by every component that needs
//! to construct, decode or look up profile information for a resource type.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::resource::{Resource, ResourceType};

const CANONICAL_PROFILE_BASE: &str = "http://hl7.org/fhir/StructureDefinition";
const STU3_PROFILE_SOURCE_BASE: &str = "https://hl7.org/fhir/STU3";

/// Registry entry for one resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    pub resource_type: ResourceType,
    /// Canonical profile identifier defined by the standard.
    pub profile_url: String,
    /// Location of the profile document fetched for base validation.
    pub profile_source: Option<String>,
}

impl ResourceInfo {
    /// Entry with the standard STU3 canonical URL and profile document location.
    pub fn stu3(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            profile_url: format!("{CANONICAL_PROFILE_BASE}/{resource_type}"),
            profile_source: Some(format!(
                "{STU3_PROFILE_SOURCE_BASE}/{}.profile.json",
                resource_type.as_str().to_lowercase()
            )),
        }
    }

    #[must_use]
    pub fn with_profile_source(mut self, source: Option<String>) -> Self {
        self.profile_source = source;
        self
    }
}

/// Immutable table of supported resource types.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    entries: BTreeMap<&'static str, ResourceInfo>,
}

impl ResourceRegistry {
    pub fn new(infos: impl IntoIterator<Item = ResourceInfo>) -> Self {
        let entries = infos
            .into_iter()
            .map(|info| (info.resource_type.as_str(), info))
            .collect();
        Self { entries }
    }

    /// Registry of every supported type with STU3 profile locations.
    pub fn stu3() -> Self {
        Self::new(ResourceType::ALL.iter().copied().map(ResourceInfo::stu3))
    }

    pub fn info(&self, resource_type: &str) -> Option<&ResourceInfo> {
        self.entries.get(resource_type)
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.entries.contains_key(resource_type)
    }

    /// Registered types ordered by name.
    pub fn resource_types(&self) -> Vec<ResourceType> {
        self.entries.values().map(|info| info.resource_type).collect()
    }

    pub fn infos(&self) -> impl Iterator<Item = &ResourceInfo> {
        self.entries.values()
    }

    /// Construct an empty instance of a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedType`] for unregistered names.
    pub fn new_resource(&self, resource_type: &str) -> Result<Resource> {
        let info = self
            .info(resource_type)
            .ok_or_else(|| CoreError::unsupported_type(resource_type))?;
        Ok(Resource::new(info.resource_type))
    }

    /// Decode a JSON payload into its typed variant.
    ///
    /// # Errors
    ///
    /// - [`CoreError::MalformedPayload`] when the bytes are not a JSON object
    ///   or a field has the wrong shape
    /// - [`CoreError::MissingType`] when `resourceType` is absent or blank
    /// - [`CoreError::UnsupportedType`] for unregistered types
    /// - [`CoreError::UnknownField`] for fields outside the variant's schema
    pub fn decode_resource(&self, data: &[u8]) -> Result<Resource> {
        let value: Value =
            serde_json::from_slice(data).map_err(|e| CoreError::malformed(e.to_string()))?;
        self.decode_value(value)
    }

    /// Decode an already parsed JSON value; same rules as [`Self::decode_resource`].
    pub fn decode_value(&self, value: Value) -> Result<Resource> {
        let Value::Object(mut object) = value else {
            return Err(CoreError::malformed("expected a JSON object"));
        };

        let resource_type = declared_type(&object)?;
        let info = self
            .info(&resource_type)
            .ok_or_else(|| CoreError::unsupported_type(resource_type.as_str()))?;

        let schema = info.resource_type.schema();
        if let Some(field) = object.keys().find(|key| !schema.contains(&key.as_str())) {
            return Err(CoreError::unknown_field(resource_type, field.as_str()));
        }

        object.remove("resourceType");
        Resource::decode_object(info.resource_type, object)
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::stu3()
    }
}

fn declared_type(object: &Map<String, Value>) -> Result<String> {
    match object.get("resourceType") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => Err(CoreError::MissingType),
        Some(other) => Err(CoreError::malformed(format!(
            "resourceType must be a string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Patient;

    #[test]
    fn stu3_registry_lists_types_sorted() {
        let registry = ResourceRegistry::stu3();
        let names: Vec<_> = registry
            .resource_types()
            .iter()
            .map(|rt| rt.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "AdvanceDirective",
                "Consent",
                "Flag",
                "Location",
                "Observation",
                "Organization",
                "Patient",
                "Practitioner",
                "PractitionerRole",
                "Task",
            ]
        );
    }

    #[test]
    fn info_exposes_profile_identifiers() {
        let registry = ResourceRegistry::stu3();
        let info = registry.info("PractitionerRole").unwrap();
        assert_eq!(
            info.profile_url,
            "http://hl7.org/fhir/StructureDefinition/PractitionerRole"
        );
        assert_eq!(
            info.profile_source.as_deref(),
            Some("https://hl7.org/fhir/STU3/practitionerrole.profile.json")
        );
        assert!(registry.info("Encounter").is_none());
    }

    #[test]
    fn new_resource_constructs_empty_variant() {
        let registry = ResourceRegistry::stu3();
        let resource = registry.new_resource("Flag").unwrap();
        assert_eq!(resource.resource_type(), ResourceType::Flag);
        assert_eq!(resource.id(), None);
        assert!(matches!(
            registry.new_resource("Encounter"),
            Err(CoreError::UnsupportedType(_))
        ));
    }

    #[test]
    fn decodes_known_variant() {
        let registry = ResourceRegistry::stu3();
        let resource = registry
            .decode_resource(
                br#"{"resourceType":"Patient","id":"pat-1","gender":"female","meta":{"profile":["http://example.org/p"]}}"#,
            )
            .unwrap();
        match &resource {
            Resource::Patient(Patient { gender, .. }) => {
                assert_eq!(gender.as_deref(), Some("female"))
            }
            other => panic!("unexpected variant {other:?}"),
        }
        assert_eq!(resource.id(), Some("pat-1"));
        assert_eq!(resource.profiles(), ["http://example.org/p".to_string()]);
    }

    #[test]
    fn null_fields_decode_as_empty() {
        let registry = ResourceRegistry::stu3();
        let resource = registry
            .decode_resource(
                br#"{"resourceType":"Patient","id":"p1","name":null,"gender":null,"meta":{"profile":null}}"#,
            )
            .unwrap();
        match &resource {
            Resource::Patient(patient) => {
                assert!(patient.name.is_empty());
                assert!(patient.gender.is_none());
            }
            other => panic!("unexpected variant {other:?}"),
        }
        assert!(resource.profiles().is_empty());

        let resource = registry
            .decode_resource(br#"{"resourceType":"Patient","id":"p1","name":[{"given":null}]}"#)
            .unwrap();
        assert_eq!(
            resource.to_value().unwrap(),
            serde_json::json!({"resourceType": "Patient", "id": "p1", "name": [{}]})
        );
    }

    #[test]
    fn rejects_unknown_top_level_field() {
        let registry = ResourceRegistry::stu3();
        let err = registry
            .decode_resource(br#"{"resourceType":"Patient","id":"pat-1","unknownField":"x"}"#)
            .unwrap_err();
        match err {
            CoreError::UnknownField {
                resource_type,
                field,
            } => {
                assert_eq!(resource_type, "Patient");
                assert_eq!(field, "unknownField");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_nested_field() {
        let registry = ResourceRegistry::stu3();
        let err = registry
            .decode_resource(
                br#"{"resourceType":"Patient","name":[{"family":["Smith"],"nickname":"Jo"}]}"#,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownField { ref field, .. } if field == "nickname"));
    }

    #[test]
    fn missing_or_blank_type_is_reported() {
        let registry = ResourceRegistry::stu3();
        for payload in [
            br#"{"id":"x"}"#.as_slice(),
            br#"{"resourceType":"  ","id":"x"}"#.as_slice(),
        ] {
            assert!(matches!(
                registry.decode_resource(payload),
                Err(CoreError::MissingType)
            ));
        }
    }

    #[test]
    fn malformed_payloads_are_reported() {
        let registry = ResourceRegistry::stu3();
        for payload in [
            b"{ not json".as_slice(),
            b"[1, 2]".as_slice(),
            br#"{"resourceType":"Patient","gender":5}"#.as_slice(),
        ] {
            assert!(matches!(
                registry.decode_resource(payload),
                Err(CoreError::MalformedPayload(_))
            ));
        }
    }

    #[test]
    fn unregistered_type_is_unsupported() {
        let registry = ResourceRegistry::new([ResourceInfo::stu3(ResourceType::Patient)]);
        assert!(matches!(
            registry.decode_resource(br#"{"resourceType":"Task","id":"t1"}"#),
            Err(CoreError::UnsupportedType(_))
        ));
        assert!(matches!(
            registry.decode_resource(br#"{"resourceType":"Encounter","id":"e1"}"#),
            Err(CoreError::UnsupportedType(_))
        ));
    }
}
