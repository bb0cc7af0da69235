//! Polymorphic resource model.
//!
//! Every supported resource type is a variant of [`Resource`]. Variants are
//! plain structs with an explicit JSON schema (`FIELDS`) and serde's
//! `deny_unknown_fields`, so strict decoding is enforced by construction.
//! `Clone` is a deep copy: no variant shares sub-structures.

use std::{fmt, str::FromStr};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::error::CoreError;

pub(crate) trait Emptiable {
    fn is_empty_value(&self) -> bool;
}

impl<T> Emptiable for Option<T> {
    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl<T> Emptiable for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

pub(crate) fn is_empty<T: Emptiable>(value: &T) -> bool {
    value.is_empty_value()
}

/// Decodes an explicit JSON `null` as the field's empty value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de> + Default,
{
    let value = <Option<T> as serde::Deserialize>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Declares a complex datatype whose fields are all optional or repeated.
macro_rules! fhir_element {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($field:ident : $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(rename_all = "camelCase", deny_unknown_fields)]
        pub struct $name {
            $(
                #[serde(
                    default,
                    deserialize_with = "crate::resource::null_as_default",
                    skip_serializing_if = "crate::resource::is_empty"
                )]
                pub $field: $ty,
            )*
        }
    };
}

/// Declares a resource variant: the shared base fields plus its own fields,
/// each mapped to an explicit JSON key.
macro_rules! fhir_resource {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($field:ident : $ty:ty => $json:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $name {
            #[serde(
                default,
                deserialize_with = "crate::resource::null_as_default",
                skip_serializing_if = "crate::resource::is_empty"
            )]
            pub id: Option<String>,
            #[serde(
                default,
                deserialize_with = "crate::resource::null_as_default",
                skip_serializing_if = "crate::resource::is_empty"
            )]
            pub meta: Option<$crate::resource::Meta>,
            #[serde(
                default,
                deserialize_with = "crate::resource::null_as_default",
                skip_serializing_if = "crate::resource::is_empty"
            )]
            pub text: Option<$crate::resource::Narrative>,
            #[serde(
                default,
                deserialize_with = "crate::resource::null_as_default",
                skip_serializing_if = "crate::resource::is_empty"
            )]
            pub contained: Vec<::serde_json::Value>,
            $(
                #[serde(
                    rename = $json,
                    default,
                    deserialize_with = "crate::resource::null_as_default",
                    skip_serializing_if = "crate::resource::is_empty"
                )]
                pub $field: $ty,
            )*
        }

        impl $name {
            /// Top-level JSON keys accepted for this resource type.
            pub const FIELDS: &'static [&'static str] =
                &["resourceType", "id", "meta", "text", "contained", $($json),*];
        }
    };
}

macro_rules! base_accessors {
    () => {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: Option<String>) {
            self.id = id;
        }

        fn meta(&self) -> Option<&$crate::resource::Meta> {
            self.meta.as_ref()
        }

        fn meta_mut(&mut self) -> &mut Option<$crate::resource::Meta> {
            &mut self.meta
        }
    };
}

mod datatypes;
mod types;

pub use datatypes::*;
pub use types::*;

/// Capabilities shared by every resource variant.
pub trait DomainResource {
    fn id(&self) -> Option<&str>;
    fn set_id(&mut self, id: Option<String>);
    fn meta(&self) -> Option<&Meta>;
    fn meta_mut(&mut self) -> &mut Option<Meta>;
    /// Outgoing references in declaration order.
    fn references(&self) -> Vec<&Reference>;
}

macro_rules! resource_variants {
    ($($variant:ident),+ $(,)?) => {
        /// Supported resource types.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ResourceType {
            $($variant),+
        }

        impl ResourceType {
            pub const ALL: &'static [ResourceType] = &[$(ResourceType::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ResourceType::$variant => stringify!($variant)),+
                }
            }

            /// Top-level JSON keys accepted when decoding this type.
            pub fn schema(&self) -> &'static [&'static str] {
                match self {
                    $(ResourceType::$variant => $variant::FIELDS),+
                }
            }
        }

        impl FromStr for ResourceType {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(ResourceType::$variant),)+
                    _ => Err(CoreError::unsupported_type(s)),
                }
            }
        }

        /// A typed resource instance, serialized with its `resourceType` tag.
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(tag = "resourceType")]
        pub enum Resource {
            $($variant($variant)),+
        }

        impl Resource {
            /// An empty instance of the given type.
            pub fn new(resource_type: ResourceType) -> Self {
                match resource_type {
                    $(ResourceType::$variant => Resource::$variant($variant::default())),+
                }
            }

            pub fn resource_type(&self) -> ResourceType {
                match self {
                    $(Resource::$variant(_) => ResourceType::$variant),+
                }
            }

            fn as_domain(&self) -> &dyn DomainResource {
                match self {
                    $(Resource::$variant(r) => r),+
                }
            }

            fn as_domain_mut(&mut self) -> &mut dyn DomainResource {
                match self {
                    $(Resource::$variant(r) => r),+
                }
            }

            pub(crate) fn decode_object(
                resource_type: ResourceType,
                object: Map<String, Value>,
            ) -> Result<Self, CoreError> {
                match resource_type {
                    $(ResourceType::$variant => {
                        decode_variant::<$variant>(resource_type, object).map(Resource::$variant)
                    }),+
                }
            }
        }

        $(
            impl From<$variant> for Resource {
                fn from(resource: $variant) -> Self {
                    Resource::$variant(resource)
                }
            }
        )+
    };
}

resource_variants!(
    Patient,
    Practitioner,
    PractitionerRole,
    Organization,
    Observation,
    Flag,
    Consent,
    AdvanceDirective,
    Location,
    Task,
);

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Resource {
    pub fn id(&self) -> Option<&str> {
        self.as_domain().id().filter(|id| !id.is_empty())
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.as_domain_mut().set_id(Some(id.into()));
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.as_domain().meta()
    }

    pub fn set_meta(&mut self, meta: Option<Meta>) {
        *self.as_domain_mut().meta_mut() = meta;
    }

    pub fn meta_mut(&mut self) -> &mut Option<Meta> {
        self.as_domain_mut().meta_mut()
    }

    /// Declared profile identifiers, empty when there is no metadata.
    pub fn profiles(&self) -> &[String] {
        self.meta().map(|m| m.profile.as_slice()).unwrap_or_default()
    }

    /// Outgoing references in declaration order.
    pub fn references(&self) -> Vec<&Reference> {
        self.as_domain().references()
    }

    /// Generic attribute tree of this resource, including `resourceType`.
    pub fn to_value(&self) -> Result<Value, CoreError> {
        Ok(serde_json::to_value(self)?)
    }
}

fn decode_variant<T: DeserializeOwned>(
    resource_type: ResourceType,
    object: Map<String, Value>,
) -> Result<T, CoreError> {
    serde_json::from_value(Value::Object(object)).map_err(|err| {
        let message = err.to_string();
        match message
            .strip_prefix("unknown field `")
            .and_then(|rest| rest.split_once('`'))
        {
            Some((field, _)) => CoreError::unknown_field(resource_type.as_str(), field),
            None => CoreError::malformed(message),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation() -> Observation {
        Observation {
            id: Some("obs-1".into()),
            subject: Some(Reference::new("Patient/p1")),
            performer: vec![Reference::new("Practitioner/pr1")],
            device: Some(Reference::new("Device/d1")),
            ..Default::default()
        }
    }

    #[test]
    fn resource_type_round_trips_through_strings() {
        for rt in ResourceType::ALL {
            assert_eq!(rt.as_str().parse::<ResourceType>().unwrap(), *rt);
        }
        assert!(matches!(
            "Encounter".parse::<ResourceType>(),
            Err(CoreError::UnsupportedType(_))
        ));
    }

    #[test]
    fn serializes_with_resource_type_tag() {
        let resource = Resource::from(Patient {
            id: Some("pat-1".into()),
            gender: Some("female".into()),
            ..Default::default()
        });
        assert_eq!(
            resource.to_value().unwrap(),
            serde_json::json!({"resourceType": "Patient", "id": "pat-1", "gender": "female"})
        );
    }

    #[test]
    fn references_follow_declaration_order() {
        let resource = Resource::from(observation());
        let refs: Vec<_> = resource
            .references()
            .into_iter()
            .filter_map(|r| r.reference.as_deref())
            .collect();
        assert_eq!(refs, vec!["Patient/p1", "Practitioner/pr1", "Device/d1"]);
    }

    #[test]
    fn consent_skips_empty_actor_references() {
        let consent = Consent {
            patient: Some(Reference::new("Patient/p1")),
            actor: vec![
                ConsentActor::default(),
                ConsentActor {
                    reference: Some(Reference::new("Organization/o1")),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(Resource::from(consent).references().len(), 2);
    }

    #[test]
    fn clone_is_independent() {
        let original = Resource::from(observation());
        let mut copy = original.clone();
        copy.set_id("other");
        copy.set_meta(Some(Meta::default().with_profile("http://example.org/p")));
        if let Resource::Observation(obs) = &mut copy {
            obs.performer.clear();
        }

        assert_eq!(original.id(), Some("obs-1"));
        assert!(original.meta().is_none());
        assert_eq!(original.references().len(), 3);
    }

    #[test]
    fn observation_effective_date_precedence() {
        let mut obs = Observation {
            issued: Some("2024-03-01T00:00:00Z".into()),
            ..Default::default()
        };
        assert_eq!(obs.effective_date(), Some("2024-03-01T00:00:00Z"));

        obs.effective_period = Some(Period {
            start: Some("2024-02-01".into()),
            end: None,
        });
        assert_eq!(obs.effective_date(), Some("2024-02-01"));

        obs.effective_date_time = Some("2024-01-01".into());
        assert_eq!(obs.effective_date(), Some("2024-01-01"));
    }

    #[test]
    fn period_without_start_shadows_issued() {
        let obs = Observation {
            issued: Some("2024-03-01T00:00:00Z".into()),
            effective_period: Some(Period {
                start: None,
                end: Some("2024-02-28".into()),
            }),
            ..Default::default()
        };
        assert_eq!(obs.effective_date(), None);
    }

    #[test]
    fn empty_id_reads_as_absent() {
        let mut resource = Resource::new(ResourceType::Task);
        assert_eq!(resource.id(), None);
        resource.set_id("");
        assert_eq!(resource.id(), None);
        resource.set_id("t1");
        assert_eq!(resource.id(), Some("t1"));
    }
}
