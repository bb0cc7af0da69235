use minifhir_api::{
    CapabilityStatement, CapabilityStatementBuilder, CapabilityStatementRestResource,
};
use minifhir_core::ResourceRegistry;

pub const RESOURCE_INTERACTIONS: &[&str] = &[
    "read",
    "vread",
    "update",
    "delete",
    "create",
    "history-instance",
    "search-type",
];

pub const SEARCH_PARAMS: &[&str] = &["_include", "_include:iterate", "_profile", "_count", "_sort"];

/// Capability statement listing every registered type in name order.
pub fn capability_statement(registry: &ResourceRegistry) -> CapabilityStatement {
    registry
        .resource_types()
        .into_iter()
        .fold(
            CapabilityStatementBuilder::new_json_stu3()
                .add_interaction("batch")
                .add_interaction("transaction"),
            |builder, resource_type| {
                builder.add_resource(
                    CapabilityStatementRestResource::new(resource_type.as_str())
                        .with_interactions(RESOURCE_INTERACTIONS)
                        .with_search_params(SEARCH_PARAMS),
                )
            },
        )
        .build()
}
