//! Resource type registry and two-phase payload decoding.
//!
//! A generic payload names its type through `schemas`. The registry peeks at
//! that list, picks the definition of the first registered core schema, and
//! only then decodes the whole payload against it.

use std::sync::Arc;

use serde_json::Value as Json;
use tracing::debug;

use super::{
    definition::ResourceDefinition,
    error::{ScimError, ScimResult},
    resource::Resource,
    resources::{group_definition, user_with_enterprise_definition},
    schema::ScimSchema,
    types::{ResourceType, ServiceProviderConfig},
    value::DecodeOptions,
};

/// Resource definitions keyed by core schema URN, plus the service provider
/// capabilities served next to them.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    definitions: Vec<Arc<ResourceDefinition>>,
    service_provider: ServiceProviderConfig,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in User (with the Enterprise extension) and
    /// Group definitions.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(user_with_enterprise_definition());
        registry.register(group_definition());
        registry
    }

    /// Register a definition, replacing any with the same core schema.
    pub fn register(&mut self, definition: Arc<ResourceDefinition>) -> &mut Self {
        debug!(
            resource_type = definition.name(),
            schema = definition.core_urn(),
            "Registering resource definition"
        );
        self.definitions
            .retain(|existing| !existing.core_urn().eq_ignore_ascii_case(definition.core_urn()));
        self.definitions.push(definition);
        self
    }

    pub fn definitions(&self) -> &[Arc<ResourceDefinition>] {
        &self.definitions
    }

    /// Definition whose core schema is `urn`, case-insensitively.
    pub fn definition_for_schema(&self, urn: &str) -> Option<Arc<ResourceDefinition>> {
        self.definitions
            .iter()
            .find(|definition| definition.core_urn().eq_ignore_ascii_case(urn))
            .cloned()
    }

    /// Definition for the endpoint a resource type is served at.
    pub fn definition_for_endpoint(&self, endpoint: &str) -> Option<Arc<ResourceDefinition>> {
        self.definitions
            .iter()
            .find(|definition| definition.endpoint().eq_ignore_ascii_case(endpoint))
            .cloned()
    }

    /// Pick the definition for a payload from its `schemas` list.
    pub fn definition_for_payload(&self, json: &Json) -> ScimResult<Arc<ResourceDefinition>> {
        let object = json
            .as_object()
            .ok_or_else(|| {
                ScimError::InvalidSyntax("Resource payload must be a JSON object".into())
            })?;
        let schemas = object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("schemas"))
            .and_then(|(_, value)| value.as_array())
            .ok_or_else(|| {
                ScimError::InvalidSyntax("Resource payload has no 'schemas' list".into())
            })?;

        schemas
            .iter()
            .filter_map(Json::as_str)
            .find_map(|urn| self.definition_for_schema(urn))
            .ok_or_else(|| {
                ScimError::InvalidValue(format!(
                    "No registered resource type matches schemas {}",
                    Json::Array(schemas.clone())
                ))
            })
    }

    /// Decode a payload of any registered type.
    pub fn decode(&self, json: &Json) -> ScimResult<Resource> {
        self.decode_with(json, DecodeOptions::default())
    }

    pub fn decode_with(&self, json: &Json, options: DecodeOptions) -> ScimResult<Resource> {
        let definition = self.definition_for_payload(json)?;
        Resource::from_json_with(definition, json, options)
    }

    /// ResourceType discovery documents (RFC 7643 Section 6).
    pub fn resource_types(&self) -> Vec<ResourceType> {
        self.definitions.iter().map(|definition| definition.resource_type()).collect()
    }

    /// ServiceProviderConfig discovery document (RFC 7643 Section 5).
    pub fn service_provider_config(&self) -> &ServiceProviderConfig {
        &self.service_provider
    }

    pub fn set_service_provider_config(&mut self, config: ServiceProviderConfig) -> &mut Self {
        self.service_provider = config;
        self
    }

    /// Schema discovery documents, core schemas first, each listed once.
    pub fn schemas(&self) -> Vec<ScimSchema> {
        let mut schemas: Vec<ScimSchema> = Vec::new();
        let all = self
            .definitions
            .iter()
            .map(|definition| definition.schema())
            .chain(self.definitions.iter().flat_map(|definition| {
                definition.extensions().iter().map(|ext| ext.schema.as_ref())
            }));
        for schema in all {
            if !schemas.iter().any(|known| known.id == schema.id) {
                schemas.push(schema.clone());
            }
        }
        schemas
    }
}
