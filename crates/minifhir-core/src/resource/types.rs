//! Resource variant declarations.
//!
//! Each variant lists its own JSON keys explicitly; the generated `FIELDS`
//! table is the schema used for strict decoding.

use super::DomainResource;
use super::datatypes::{
    Address, CodeableConcept, ConsentActor, ContactPoint, HumanName, Identifier, Period, Reference,
};

fhir_resource! {
    /// Demographics for an individual receiving care.
    Patient {
        identifier: Vec<Identifier> => "identifier",
        name: Vec<HumanName> => "name",
        telecom: Vec<ContactPoint> => "telecom",
        gender: Option<String> => "gender",
        birth_date: Option<String> => "birthDate",
        address: Vec<Address> => "address",
        managing_organization: Option<Reference> => "managingOrganization",
        general_practitioner: Vec<Reference> => "generalPractitioner",
    }
}

impl DomainResource for Patient {
    base_accessors!();

    fn references(&self) -> Vec<&Reference> {
        self.managing_organization
            .iter()
            .chain(&self.general_practitioner)
            .collect()
    }
}

fhir_resource! {
    Practitioner {
        identifier: Vec<Identifier> => "identifier",
        name: Vec<HumanName> => "name",
        telecom: Vec<ContactPoint> => "telecom",
        address: Vec<Address> => "address",
    }
}

impl DomainResource for Practitioner {
    base_accessors!();

    fn references(&self) -> Vec<&Reference> {
        Vec::new()
    }
}

fhir_resource! {
    PractitionerRole {
        practitioner: Option<Reference> => "practitioner",
        organization: Option<Reference> => "organization",
        location: Vec<Reference> => "location",
        healthcare_service: Vec<Reference> => "healthcareService",
    }
}

impl DomainResource for PractitionerRole {
    base_accessors!();

    fn references(&self) -> Vec<&Reference> {
        self.practitioner
            .iter()
            .chain(&self.organization)
            .chain(&self.location)
            .chain(&self.healthcare_service)
            .collect()
    }
}

fhir_resource! {
    Organization {
        identifier: Vec<Identifier> => "identifier",
        name: Option<String> => "name",
        telecom: Vec<ContactPoint> => "telecom",
        address: Vec<Address> => "address",
        part_of: Option<Reference> => "partOf",
    }
}

impl DomainResource for Organization {
    base_accessors!();

    fn references(&self) -> Vec<&Reference> {
        self.part_of.iter().collect()
    }
}

fhir_resource! {
    /// Measurements and simple assertions about a subject.
    Observation {
        status: Option<String> => "status",
        code: Option<CodeableConcept> => "code",
        subject: Option<Reference> => "subject",
        performer: Vec<Reference> => "performer",
        encounter: Option<Reference> => "encounter",
        specimen: Option<Reference> => "specimen",
        device: Option<Reference> => "device",
        effective_date_time: Option<String> => "effectiveDateTime",
        effective_period: Option<Period> => "effectivePeriod",
        issued: Option<String> => "issued",
    }
}

impl Observation {
    /// Clinically relevant time.
    ///
    /// The first element present wins: effective date-time, then the effective
    /// period (its start, which may be empty), then issued.
    pub fn effective_date(&self) -> Option<&str> {
        if let Some(date_time) = &self.effective_date_time {
            return Some(date_time.as_str());
        }
        if let Some(period) = &self.effective_period {
            return period.start.as_deref();
        }
        self.issued.as_deref()
    }
}

impl DomainResource for Observation {
    base_accessors!();

    fn references(&self) -> Vec<&Reference> {
        self.subject
            .iter()
            .chain(&self.performer)
            .chain(&self.encounter)
            .chain(&self.specimen)
            .chain(&self.device)
            .collect()
    }
}

fhir_resource! {
    Flag {
        status: Option<String> => "status",
        category: Option<CodeableConcept> => "category",
        code: Option<CodeableConcept> => "code",
        subject: Option<Reference> => "subject",
        encounter: Option<Reference> => "encounter",
        author: Option<Reference> => "author",
    }
}

impl DomainResource for Flag {
    base_accessors!();

    fn references(&self) -> Vec<&Reference> {
        self.subject
            .iter()
            .chain(&self.encounter)
            .chain(&self.author)
            .collect()
    }
}

fhir_resource! {
    Consent {
        status: Option<String> => "status",
        patient: Option<Reference> => "patient",
        actor: Vec<ConsentActor> => "actor",
        organization: Vec<Reference> => "organization",
        source_reference: Option<Reference> => "sourceReference",
    }
}

impl DomainResource for Consent {
    base_accessors!();

    fn references(&self) -> Vec<&Reference> {
        let actors = self
            .actor
            .iter()
            .filter_map(|actor| actor.reference.as_ref())
            .filter(|r| r.reference.as_deref().is_some_and(|s| !s.is_empty()));

        self.patient
            .iter()
            .chain(actors)
            .chain(&self.organization)
            .chain(&self.source_reference)
            .collect()
    }
}

fhir_resource! {
    AdvanceDirective {
        patient: Option<Reference> => "patient",
        author: Vec<Reference> => "author",
        source_reference: Option<Reference> => "sourceReference",
    }
}

impl DomainResource for AdvanceDirective {
    base_accessors!();

    fn references(&self) -> Vec<&Reference> {
        self.patient
            .iter()
            .chain(&self.author)
            .chain(&self.source_reference)
            .collect()
    }
}

fhir_resource! {
    Location {
        status: Option<String> => "status",
        name: Option<String> => "name",
        description: Option<String> => "description",
        mode: Option<String> => "mode",
        r#type: Option<CodeableConcept> => "type",
        telecom: Vec<ContactPoint> => "telecom",
        address: Option<Address> => "address",
        physical_type: Option<CodeableConcept> => "physicalType",
        managing_organization: Option<Reference> => "managingOrganization",
        part_of: Option<Reference> => "partOf",
    }
}

impl DomainResource for Location {
    base_accessors!();

    fn references(&self) -> Vec<&Reference> {
        self.managing_organization
            .iter()
            .chain(&self.part_of)
            .collect()
    }
}

fhir_resource! {
    Task {
        status: Option<String> => "status",
        intent: Option<String> => "intent",
        priority: Option<String> => "priority",
        description: Option<String> => "description",
        focus: Option<Reference> => "focus",
        r#for: Option<Reference> => "for",
        requester: Option<Reference> => "requester",
        owner: Option<Reference> => "owner",
        execution_period: Option<Period> => "executionPeriod",
        reason_code: Option<CodeableConcept> => "reasonCode",
        based_on: Vec<Reference> => "basedOn",
    }
}

impl DomainResource for Task {
    base_accessors!();

    fn references(&self) -> Vec<&Reference> {
        self.focus
            .iter()
            .chain(&self.r#for)
            .chain(&self.requester)
            .chain(&self.owner)
            .chain(&self.based_on)
            .collect()
    }
}
