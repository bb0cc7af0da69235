//! Rule sets derived from StructureDefinition profile documents.
//!
//! Only cardinality is kept: element paths with `min > 0` become required
//! paths, and `[x]` elements become choice groups whose alternatives are the
//! sibling elements sharing the choice prefix at the same depth.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

const CHOICE_MARKER: &str = "[x]";

/// Simplified validation contract for one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub resource_type: String,
    #[serde(default)]
    pub required_paths: Vec<String>,
    #[serde(default)]
    pub choices: Vec<ChoiceRule>,
}

/// Alternatives of which at least one must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRule {
    pub base_path: String,
    #[serde(default)]
    pub choices: Vec<String>,
}

impl RuleSet {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            required_paths: Vec::new(),
            choices: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_required(mut self, path: impl Into<String>) -> Self {
        self.required_paths.push(path.into());
        self
    }

    #[must_use]
    pub fn with_choice<I, S>(mut self, base_path: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices.push(ChoiceRule {
            base_path: base_path.into(),
            choices: choices.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Derive rules from a StructureDefinition JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Decode`] for unparseable JSON and
    /// [`ProfileError::InvalidProfile`] when the document is not a
    /// StructureDefinition or declares no target type.
    pub fn from_structure_definition(body: &[u8]) -> Result<Self, ProfileError> {
        let profile: StructureDefinition = serde_json::from_slice(body)?;
        if profile.resource_type != "StructureDefinition" {
            return Err(ProfileError::invalid_profile(format!(
                "unexpected resourceType: {}",
                profile.resource_type
            )));
        }
        if profile.target_type.is_empty() {
            return Err(ProfileError::invalid_profile("profile missing type"));
        }

        let prefix = format!("{}.", profile.target_type);
        let elements = profile.snapshot.element.as_slice();

        let mut required = BTreeSet::new();
        let mut choices: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (path, min) in relative_paths(elements, &prefix) {
            if min <= 0 {
                continue;
            }
            if path.contains(CHOICE_MARKER) {
                choices.entry(path).or_default();
            } else {
                required.insert(path);
            }
        }

        for (path, _) in relative_paths(elements, &prefix) {
            for (base, alternatives) in choices.iter_mut() {
                let base_prefix = base.strip_suffix(CHOICE_MARKER).unwrap_or(*base);
                if path != *base && path.starts_with(base_prefix) && depth(base_prefix) == depth(path)
                {
                    alternatives.insert(path);
                }
            }
        }

        Ok(Self {
            resource_type: profile.target_type.clone(),
            required_paths: required.into_iter().map(str::to_owned).collect(),
            choices: choices
                .into_iter()
                .map(|(base, alternatives)| ChoiceRule {
                    base_path: base.to_owned(),
                    choices: alternatives.into_iter().map(str::to_owned).collect(),
                })
                .collect(),
        })
    }
}

/// Element paths relative to `prefix`, paired with their minimum cardinality.
fn relative_paths<'a>(
    elements: &'a [ElementDefinition],
    prefix: &'a str,
) -> impl Iterator<Item = (&'a str, i64)> + 'a {
    elements.iter().filter_map(move |element| {
        element
            .path
            .strip_prefix(prefix)
            .filter(|rest| !rest.is_empty())
            .map(|rest| (rest, element.min))
    })
}

fn depth(path: &str) -> usize {
    path.matches('.').count()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructureDefinition {
    #[serde(default)]
    resource_type: String,
    #[serde(rename = "type", default)]
    target_type: String,
    #[serde(default)]
    snapshot: Snapshot,
}

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    element: Vec<ElementDefinition>,
}

#[derive(Debug, Deserialize)]
struct ElementDefinition {
    #[serde(default)]
    path: String,
    #[serde(default)]
    min: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observation_profile() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "resourceType": "StructureDefinition",
            "url": "http://hl7.org/fhir/StructureDefinition/Observation",
            "type": "Observation",
            "snapshot": {
                "element": [
                    {"path": "Observation", "min": 0, "max": "*"},
                    {"path": "Observation.status", "min": 1, "max": "1"},
                    {"path": "Observation.code", "min": 1},
                    {"path": "Observation.subject", "min": 0},
                    {"path": "Observation.effective[x]", "min": 1},
                    {"path": "Observation.effectiveDateTime", "min": 0},
                    {"path": "Observation.effectivePeriod", "min": 0},
                    {"path": "Observation.effectivePeriod.start", "min": 0},
                    {"path": "Observation.component.code", "min": 1},
                    {"path": "Patient.gender", "min": 1}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn derives_required_paths_and_choices() {
        let rules = RuleSet::from_structure_definition(&observation_profile()).unwrap();
        assert_eq!(rules.resource_type, "Observation");
        assert_eq!(
            rules.required_paths,
            vec!["code", "component.code", "status"]
        );
        assert_eq!(
            rules.choices,
            vec![ChoiceRule {
                base_path: "effective[x]".into(),
                choices: vec!["effectiveDateTime".into(), "effectivePeriod".into()],
            }]
        );
    }

    #[test]
    fn rejects_non_structure_definition() {
        let body = serde_json::to_vec(&json!({"resourceType": "Patient", "type": "Patient"})).unwrap();
        assert!(matches!(
            RuleSet::from_structure_definition(&body),
            Err(ProfileError::InvalidProfile(_))
        ));
    }

    #[test]
    fn rejects_missing_target_type() {
        let body = serde_json::to_vec(&json!({"resourceType": "StructureDefinition"})).unwrap();
        let err = RuleSet::from_structure_definition(&body).unwrap_err();
        assert_eq!(err.to_string(), "invalid profile: profile missing type");
    }

    #[test]
    fn rejects_unparseable_document() {
        assert!(matches!(
            RuleSet::from_structure_definition(b"<html>"),
            Err(ProfileError::Decode(_))
        ));
    }

    #[test]
    fn cache_envelope_shape_is_camel_case() {
        let rules = RuleSet::new("Patient")
            .with_required("gender")
            .with_choice("deceased[x]", ["deceasedBoolean"]);
        assert_eq!(
            serde_json::to_value(&rules).unwrap(),
            json!({
                "resourceType": "Patient",
                "requiredPaths": ["gender"],
                "choices": [{"basePath": "deceased[x]", "choices": ["deceasedBoolean"]}]
            })
        );
    }
}
