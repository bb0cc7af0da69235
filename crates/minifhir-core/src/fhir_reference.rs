//! Relative reference parsing.
//!
//! Only the `Type/id` form is recognised. Absolute URLs, contained references
//! (`#id`) and versioned references (`Type/id/_history/n`) do not resolve.

use std::fmt;

use crate::error::CoreError;

/// A resolved `Type/id` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FhirReference {
    pub resource_type: String,
    pub id: String,
}

impl FhirReference {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Key used for de-duplication, `Type/id`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.resource_type, self.id)
    }
}

impl fmt::Display for FhirReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

/// Parse a reference string of exactly two non-empty `/`-separated parts.
///
/// # Errors
///
/// Returns [`CoreError::InvalidReference`] for anything else.
pub fn parse_reference(reference: &str) -> Result<FhirReference, CoreError> {
    let mut parts = reference.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(resource_type), Some(id), None) if !resource_type.is_empty() && !id.is_empty() => {
            Ok(FhirReference::new(resource_type, id))
        }
        _ => Err(CoreError::invalid_reference(reference)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relative_reference() {
        let r = parse_reference("Patient/123").unwrap();
        assert_eq!(r.resource_type, "Patient");
        assert_eq!(r.id, "123");
        assert_eq!(r.key(), "Patient/123");
        assert_eq!(r.to_string(), "Patient/123");
    }

    #[test]
    fn rejects_other_shapes() {
        for bad in [
            "",
            "Patient",
            "Patient/",
            "/123",
            "Patient/123/_history/1",
            "http://example.org/fhir/Patient/123",
            "#contained",
        ] {
            assert!(
                matches!(parse_reference(bad), Err(CoreError::InvalidReference(_))),
                "expected {bad:?} to be rejected"
            );
        }
    }
}
