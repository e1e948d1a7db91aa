//! SCIM 2.0 PATCH Operations
//!
//! This module implements validation and execution of SCIM PATCH requests per
//! RFC 7644 Section 3.5.2.
//!
//! ## Operations
//!
//! - `add`: Add value(s) to an attribute, appending to multi-valued ones
//! - `remove`: Remove an attribute, or matching values of a multi-valued one
//! - `replace`: Replace an attribute value
//!
//! Operations are applied in document order against one resource. An error
//! aborts the remaining operations; mutations already applied stand, so
//! callers needing atomicity patch a clone and swap it in on success.
//!
//! ## Examples
//!
//! ```json
//! {
//!   "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
//!   "Operations": [
//!     { "op": "replace", "path": "displayName", "value": "New Name" },
//!     { "op": "add", "path": "emails", "value": [{"type": "home", "value": "home@example.com"}] },
//!     { "op": "remove", "path": "nickName" }
//!   ]
//! }
//! ```

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as Json;
use tracing::debug;

use super::{
    context::Context,
    definition::{ResourceDefinition, Scope},
    error::{ScimError, ScimResult},
    path::Path,
    resource::{Resource, root_attribute},
    schema::{Mutability, SchemaAttribute},
    types::SCHEMA_PATCH_OP,
    value::Value,
};
use crate::config::PatchConfig;

/// A SCIM PATCH request containing one or more operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    /// SCIM schema URIs (must contain the PatchOp schema)
    #[serde(default)]
    pub schemas: Vec<String>,

    /// List of patch operations to apply
    #[serde(rename = "Operations", alias = "operations", default)]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    /// Create a new patch request with operations
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![SCHEMA_PATCH_OP.to_string()],
            operations,
        }
    }

    /// Validate the request for a resource type.
    ///
    /// Structural checks on paths and values only run in the patch request
    /// context; annotation checks (mutability, required) run in every context.
    pub fn validate(&self, definition: &ResourceDefinition, context: Context) -> ScimResult<()> {
        if !self.schemas.iter().any(|s| s.eq_ignore_ascii_case(SCHEMA_PATCH_OP)) {
            return Err(ScimError::InvalidSyntax(format!(
                "PATCH request schemas must contain '{SCHEMA_PATCH_OP}'"
            )));
        }
        if self.operations.is_empty() {
            return Err(ScimError::InvalidValue(
                "PATCH request must contain at least one operation".into(),
            ));
        }
        for operation in &self.operations {
            operation.validate(definition, context)?;
        }
        Ok(())
    }

    /// Apply all operations to `resource` with the default settings.
    ///
    /// Returns whether any operation changed the resource.
    pub fn apply(&self, resource: &mut Resource) -> ScimResult<bool> {
        self.apply_with(resource, &PatchConfig::default())
    }

    /// Apply all operations to `resource`.
    pub fn apply_with(&self, resource: &mut Resource, config: &PatchConfig) -> ScimResult<bool> {
        if let Some(max) = config.max_operations
            && self.operations.len() > max
        {
            return Err(ScimError::TooMany(format!(
                "PATCH request has {} operations, the maximum is {max}",
                self.operations.len()
            )));
        }
        self.validate(resource.definition(), Context::ResourcePatchRequest)?;

        let mut changed = false;
        for (index, operation) in self.operations.iter().enumerate() {
            let applied = operation.apply(resource, config)?;
            debug!(
                index,
                op = %operation.op,
                path = operation.path.as_deref().unwrap_or(""),
                changed = applied,
                "Applied PATCH operation"
            );
            changed |= applied;
        }
        Ok(changed)
    }
}

/// The kind of a PATCH operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Remove,
    Replace,
}

impl FromStr for PatchOpKind {
    type Err = ScimError;

    // Microsoft Entra ID sends "Add", "Replace" and "Remove"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(PatchOpKind::Add),
            "remove" => Ok(PatchOpKind::Remove),
            "replace" => Ok(PatchOpKind::Replace),
            _ => Err(ScimError::InvalidValue(format!("Unknown PATCH operation '{s}'"))),
        }
    }
}

impl<'de> Deserialize<'de> for PatchOpKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for PatchOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatchOpKind::Add => "add",
            PatchOpKind::Remove => "remove",
            PatchOpKind::Replace => "replace",
        };
        f.write_str(s)
    }
}

/// A single SCIM PATCH operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOpKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
}

impl PatchOperation {
    /// Create an add operation
    pub fn add(path: impl Into<String>, value: Json) -> Self {
        Self {
            op: PatchOpKind::Add,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    /// Create a replace operation
    pub fn replace(path: impl Into<String>, value: Json) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    /// Create a remove operation
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path: Some(path.into()),
            value: None,
        }
    }

    /// Validate the operation against a resource type.
    pub fn validate(&self, definition: &ResourceDefinition, context: Context) -> ScimResult<()> {
        if context == Context::ResourcePatchRequest {
            if let Some(path) = &self.path {
                Path::parse(path)?;
            }
            if self.op == PatchOpKind::Remove && self.path.is_none() {
                return Err(ScimError::NoTarget("Remove operations require a path".into()));
            }
            if self.op == PatchOpKind::Add && self.value.is_none() {
                return Err(ScimError::InvalidValue("Add operations require a value".into()));
            }
        }

        match (&self.path, &self.value) {
            (Some(text), _) => {
                // Unknown attributes are tolerated here (RFC 7644 Section 3.5.2)
                let Ok(path) = Path::parse(text) else {
                    return Ok(());
                };
                let Ok(location) = definition.locate(&path) else {
                    return Ok(());
                };
                if let Some(attr) = definition.location_attribute(&location) {
                    return self.check_attribute(attr, text);
                }
                if let Scope::Extension(index) = location.scope
                    && self.op == PatchOpKind::Remove
                    && definition.extensions()[index].required
                {
                    return Err(ScimError::InvalidValue(format!(
                        "Extension '{text}' is required and cannot be removed"
                    )));
                }
                Ok(())
            }
            (None, Some(Json::Object(object))) if self.op != PatchOpKind::Remove => {
                for key in object.keys() {
                    if let Some(attr) = root_attribute(definition, key) {
                        self.check_attribute(attr, key)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn check_attribute(&self, attr: &SchemaAttribute, name: &str) -> ScimResult<()> {
        match (self.op, attr.mutability()) {
            (PatchOpKind::Add | PatchOpKind::Replace, Mutability::ReadOnly) => {
                return Err(ScimError::Mutability(format!(
                    "Attribute '{name}' is readOnly and cannot be modified"
                )));
            }
            (PatchOpKind::Replace, Mutability::Immutable) => {
                return Err(ScimError::Mutability(format!(
                    "Attribute '{name}' is immutable and cannot be replaced"
                )));
            }
            _ => {}
        }
        if self.op == PatchOpKind::Remove && attr.is_required() {
            return Err(ScimError::InvalidValue(format!(
                "Attribute '{name}' is required and cannot be removed"
            )));
        }
        Ok(())
    }

    fn apply(&self, resource: &mut Resource, config: &PatchConfig) -> ScimResult<bool> {
        let path = match &self.path {
            Some(text) => Path::parse(text)?,
            None => Path::root(),
        };
        let mut bound = path.bind(resource.definition().clone());
        if !config.strict_paths {
            bound = bound.lenient();
        }

        if self.op == PatchOpKind::Remove {
            return bound.delete(resource, self.value.as_ref());
        }

        let value = self.value.as_ref().unwrap_or(&Json::Null);
        if self.path.is_none() && !value.is_object() {
            return Err(ScimError::InvalidValue(format!(
                "{} operations without a path require an object value",
                self.op
            )));
        }

        let is_add = self.op == PatchOpKind::Add;
        if !config.enforce_primary {
            return bound.set(resource, value, is_add);
        }

        // Work on a copy so a rejected operation leaves the resource untouched
        let before = PrimarySnapshot::capture(resource);
        let mut candidate = resource.clone();
        let changed = bound.set(&mut candidate, value, is_add)?;
        before.enforce(&mut candidate)?;
        *resource = candidate;
        Ok(changed)
    }
}

// =============================================================================
// Primary Exclusivity
// =============================================================================

/// Indices of `primary = true` elements per primary-bearing collection.
struct PrimarySnapshot(HashMap<(Scope, String), Vec<usize>>);

impl PrimarySnapshot {
    fn capture(resource: &Resource) -> Self {
        let definition = resource.definition();
        let mut indices = HashMap::new();
        for scope in scopes(definition) {
            let Some(complex) = resource.scope(scope) else {
                continue;
            };
            for attr in primary_collections(definition.scope_attributes(scope)) {
                if let Some(Value::Multi(items)) = complex.get(&attr.name) {
                    indices.insert((scope, attr.name.clone()), primary_indices(items));
                }
            }
        }
        Self(indices)
    }

    /// Keep at most one primary element per collection.
    ///
    /// When several elements are primary, the one that just became primary
    /// wins and the others are demoted. Without exactly one such element the
    /// collection cannot be repaired.
    fn enforce(&self, resource: &mut Resource) -> ScimResult<()> {
        let definition = resource.definition().clone();
        for scope in scopes(&definition) {
            let complex = match scope {
                Scope::Core => Some(resource.attributes_mut()),
                Scope::Extension(index) => resource.extension_mut(index),
            };
            let Some(complex) = complex else {
                continue;
            };
            for attr in primary_collections(definition.scope_attributes(scope)) {
                let Some(Value::Multi(items)) = complex.get_mut(&attr.name) else {
                    continue;
                };
                let current = primary_indices(items);
                if current.len() <= 1 {
                    continue;
                }

                let previous = self
                    .0
                    .get(&(scope, attr.name.clone()))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let added: Vec<usize> =
                    current.iter().copied().filter(|i| !previous.contains(i)).collect();
                let keep = match added.as_slice() {
                    [keep] => *keep,
                    [] => {
                        return Err(ScimError::InvalidValue(format!(
                            "Attribute '{}' has multiple primary values",
                            attr.name
                        )));
                    }
                    _ => {
                        return Err(ScimError::InvalidValue(format!(
                            "Attribute '{}' received multiple new primary values",
                            attr.name
                        )));
                    }
                };

                for index in current.into_iter().filter(|i| *i != keep) {
                    if let Value::Complex(element) = &mut items[index] {
                        element.insert("primary".to_string(), Value::Boolean(false));
                    }
                }
                debug!(attribute = %attr.name, primary = keep, "Demoted previous primary values");
            }
        }
        Ok(())
    }
}

fn scopes(definition: &ResourceDefinition) -> impl Iterator<Item = Scope> + use<> {
    std::iter::once(Scope::Core).chain((0..definition.extensions().len()).map(Scope::Extension))
}

fn primary_collections(attributes: &[SchemaAttribute]) -> impl Iterator<Item = &SchemaAttribute> {
    attributes.iter().filter(|attr| attr.multi_valued && attr.has_primary())
}

fn primary_indices(items: &[Value]) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| {
            item.as_complex()
                .and_then(|element| element.get("primary"))
                .and_then(Value::as_bool)
                == Some(true)
        })
        .map(|(index, _)| index)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
