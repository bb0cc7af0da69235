//! Shared complex datatypes used by the resource variants.

fhir_element! {
    /// Resource metadata maintained by the store.
    Meta {
        version_id: Option<String>,
        last_updated: Option<String>,
        profile: Vec<String>,
    }
}

impl Meta {
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile.push(profile.into());
        self
    }
}

fhir_element! {
    Narrative {
        status: Option<String>,
        div: Option<String>,
    }
}

fhir_element! {
    Coding {
        system: Option<String>,
        code: Option<String>,
        display: Option<String>,
    }
}

fhir_element! {
    CodeableConcept {
        coding: Vec<Coding>,
        text: Option<String>,
    }
}

fhir_element! {
    Identifier {
        r#use: Option<String>,
        r#type: Option<CodeableConcept>,
        system: Option<String>,
        value: Option<String>,
    }
}

fhir_element! {
    HumanName {
        r#use: Option<String>,
        text: Option<String>,
        family: Vec<String>,
        given: Vec<String>,
    }
}

fhir_element! {
    Address {
        r#use: Option<String>,
        r#type: Option<String>,
        text: Option<String>,
        line: Vec<String>,
        city: Option<String>,
        state: Option<String>,
        postal_code: Option<String>,
        country: Option<String>,
    }
}

fhir_element! {
    Period {
        start: Option<String>,
        end: Option<String>,
    }
}

fhir_element! {
    ContactPoint {
        system: Option<String>,
        value: Option<String>,
        r#use: Option<String>,
    }
}

fhir_element! {
    /// A `Type/id` pointer to another resource.
    Reference {
        reference: Option<String>,
        display: Option<String>,
    }
}

impl Reference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            display: None,
        }
    }
}

fhir_element! {
    ConsentActor {
        role: Option<CodeableConcept>,
        reference: Option<Reference>,
    }
}
