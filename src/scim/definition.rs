//! Resource definitions: a core schema, the common attributes and the
//! extension schemas a resource type accepts.
//!
//! Definitions are immutable once built and shared behind `Arc`. Each one
//! memoizes path resolution so repeated PATCH operations on the same path
//! only walk the schema once.

use std::sync::Arc;

use dashmap::DashMap;

use super::{
    error::{ScimError, ScimResult},
    path::Path,
    schema::{Mutability, Returned, SchemaAttribute, ScimSchema, Uniqueness, find_attribute},
    types::{ResourceType, SCHEMA_RESOURCE_TYPE, SchemaExtension},
    urn::{attribute_urn, strip_schema, sub_attribute_urn},
};

/// Attributes every resource carries (RFC 7643 Section 3.1).
pub fn common_attributes() -> Vec<SchemaAttribute> {
    vec![
        SchemaAttribute::reference("schemas", &["uri"])
            .multi()
            .with_required()
            .with_case_exact()
            .with_returned(Returned::Always),
        SchemaAttribute::string("id")
            .with_mutability(Mutability::ReadOnly)
            .with_returned(Returned::Always)
            .with_case_exact()
            .with_uniqueness(Uniqueness::Global),
        SchemaAttribute::string("externalId").with_case_exact(),
        SchemaAttribute::complex(
            "meta",
            vec![
                SchemaAttribute::string("resourceType")
                    .with_mutability(Mutability::ReadOnly)
                    .with_case_exact(),
                SchemaAttribute::date_time("created").with_mutability(Mutability::ReadOnly),
                SchemaAttribute::date_time("lastModified").with_mutability(Mutability::ReadOnly),
                SchemaAttribute::reference("location", &["uri"])
                    .with_mutability(Mutability::ReadOnly),
                SchemaAttribute::string("version")
                    .with_mutability(Mutability::ReadOnly)
                    .with_case_exact(),
            ],
        )
        .with_mutability(Mutability::ReadOnly),
    ]
}

/// Common attribute names that never appear in attribute listings.
const UNLISTED: [&str; 3] = ["schemas", "id", "meta"];

/// Upper bound on memoized path resolutions per definition.
const MAX_CACHED_LOCATIONS: usize = 1024;

/// An extension schema attached to a resource definition.
#[derive(Debug, Clone)]
pub struct ExtensionDefinition {
    pub schema: Arc<ScimSchema>,
    pub required: bool,
}

/// Where a path's attributes live: the root, or one extension slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Core,
    Extension(usize),
}

/// A path resolved against a definition.
///
/// `segments` holds the declared attribute names, outermost first. An empty
/// list addresses the scope itself (the root, or an extension slot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub scope: Scope,
    pub segments: Vec<String>,
}

/// A SCIM resource type: core schema plus extensions.
#[derive(Debug)]
pub struct ResourceDefinition {
    name: String,
    endpoint: String,
    description: Option<String>,
    schema: Arc<ScimSchema>,
    attributes: Vec<SchemaAttribute>,
    extensions: Vec<ExtensionDefinition>,
    locations: DashMap<String, Arc<Location>>,
}

impl ResourceDefinition {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        schema: Arc<ScimSchema>,
    ) -> Self {
        let mut attributes = common_attributes();
        attributes.extend(schema.attributes.iter().cloned());
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            description: schema.description.clone(),
            schema,
            attributes,
            extensions: Vec::new(),
            locations: DashMap::new(),
        }
    }

    /// Attach an extension schema.
    pub fn with_extension(mut self, schema: Arc<ScimSchema>, required: bool) -> Self {
        self.extensions.push(ExtensionDefinition { schema, required });
        self.locations.clear();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn schema(&self) -> &ScimSchema {
        &self.schema
    }

    /// URN of the core schema.
    pub fn core_urn(&self) -> &str {
        &self.schema.id
    }

    /// Root attributes: the common attributes followed by the core schema's.
    pub fn attributes(&self) -> &[SchemaAttribute] {
        &self.attributes
    }

    pub fn extensions(&self) -> &[ExtensionDefinition] {
        &self.extensions
    }

    /// Find a root attribute by name, case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        find_attribute(&self.attributes, name)
    }

    /// Find an extension by URN, case-insensitively.
    pub fn extension(&self, urn: &str) -> Option<(usize, &ExtensionDefinition)> {
        self.extensions
            .iter()
            .enumerate()
            .find(|(_, ext)| ext.schema.id.eq_ignore_ascii_case(urn))
    }

    /// Attributes of a scope.
    pub fn scope_attributes(&self, scope: Scope) -> &[SchemaAttribute] {
        match scope {
            Scope::Core => &self.attributes,
            Scope::Extension(i) => &self.extensions[i].schema.attributes,
        }
    }

    /// Schema URN of a scope.
    pub fn scope_urn(&self, scope: Scope) -> &str {
        match scope {
            Scope::Core => self.core_urn(),
            Scope::Extension(i) => &self.extensions[i].schema.id,
        }
    }

    /// Resolve a path to a location.
    ///
    /// Successful resolutions are memoized until the cache is full; failures
    /// are never stored.
    pub fn locate(&self, path: &Path) -> ScimResult<Arc<Location>> {
        let key = path.as_str().to_lowercase();
        if let Some(hit) = self.locations.get(&key) {
            return Ok(hit.value().clone());
        }
        let resolved = Arc::new(self.resolve_location(path)?);
        if self.locations.len() < MAX_CACHED_LOCATIONS {
            self.locations.insert(key, resolved.clone());
        }
        Ok(resolved)
    }

    fn resolve_location(&self, path: &Path) -> ScimResult<Location> {
        let text = path.as_str();
        let (scope, rest) = if text.contains(':') {
            self.split_schema(text).ok_or_else(|| {
                ScimError::InvalidPath(format!("Unknown schema URN in path '{text}'"))
            })?
        } else {
            (Scope::Core, text)
        };

        let mut segments = Vec::new();
        if rest.is_empty() {
            return Ok(Location { scope, segments });
        }

        let parts: Vec<&str> = rest.split('.').collect();
        let mut attributes = self.scope_attributes(scope);
        for (i, part) in parts.iter().enumerate() {
            let attr = find_attribute(attributes, part)
                .ok_or_else(|| ScimError::path_not_found(text, *part))?;
            segments.push(attr.name.clone());
            if let Some(next) = parts.get(i + 1) {
                if !attr.is_complex() {
                    return Err(ScimError::path_not_found(text, *next));
                }
                attributes = &attr.sub_attributes;
            }
        }
        Ok(Location { scope, segments })
    }

    /// Match the schema prefix of a path; the longest matching URN wins.
    fn split_schema<'a>(&self, text: &'a str) -> Option<(Scope, &'a str)> {
        let core = strip_schema(text, self.core_urn())
            .map(|rest| (Scope::Core, self.core_urn().len(), rest));
        let extensions = self.extensions.iter().enumerate().filter_map(|(i, ext)| {
            strip_schema(text, &ext.schema.id)
                .map(|rest| (Scope::Extension(i), ext.schema.id.len(), rest))
        });
        core.into_iter()
            .chain(extensions)
            .max_by_key(|(_, len, _)| *len)
            .map(|(scope, _, rest)| (scope, rest))
    }

    /// Attribute a location points at, if it names an attribute.
    pub fn location_attribute(&self, location: &Location) -> Option<&SchemaAttribute> {
        let (first, rest) = location.segments.split_first()?;
        let mut attr = find_attribute(self.scope_attributes(location.scope), first)?;
        for segment in rest {
            attr = attr.sub_attribute(segment)?;
        }
        Some(attr)
    }

    /// Attribute URN of a location (RFC 7643 Section 10.2).
    pub fn location_urn(&self, location: &Location) -> String {
        let schema = self.scope_urn(location.scope);
        match location.segments.split_first() {
            None => schema.to_string(),
            Some((first, rest)) => rest.iter().fold(attribute_urn(schema, first), |urn, segment| {
                sub_attribute_urn(&urn, segment)
            }),
        }
    }

    /// Enumerate the addressable paths of this definition.
    pub fn iter_paths(&self, listing: &PathListing) -> Vec<Path> {
        let mut paths = Vec::new();
        let core = self
            .attributes
            .iter()
            .filter(|attr| !UNLISTED.contains(&attr.name.as_str()));
        collect_paths(core, None, listing, &mut paths);

        if listing.include_extensions {
            for ext in &self.extensions {
                let slot_mutability = Mutability::default();
                if listing.matches(ext.required, slot_mutability) {
                    paths.push(Path::from_trusted(ext.schema.id.clone()));
                }
                let attributes = ext.schema.attributes.iter();
                collect_paths(attributes, Some(&ext.schema.id), listing, &mut paths);
            }
        }
        paths
    }

    /// Discovery document for this resource type (RFC 7643 Section 6).
    pub fn resource_type(&self) -> ResourceType {
        ResourceType {
            schemas: vec![SCHEMA_RESOURCE_TYPE.to_string()],
            id: self.name.clone(),
            name: self.name.clone(),
            endpoint: self.endpoint.clone(),
            description: self.description.clone(),
            schema: self.core_urn().to_string(),
            schema_extensions: self
                .extensions
                .iter()
                .map(|ext| SchemaExtension {
                    schema: ext.schema.id.clone(),
                    required: ext.required,
                })
                .collect(),
        }
    }
}

fn collect_paths<'a>(
    attributes: impl Iterator<Item = &'a SchemaAttribute>,
    schema: Option<&str>,
    listing: &PathListing,
    paths: &mut Vec<Path>,
) {
    for attr in attributes {
        if !listing.matches(attr.is_required(), attr.mutability()) {
            continue;
        }
        let text = match schema {
            Some(urn) => attribute_urn(urn, &attr.name),
            None => attr.name.clone(),
        };
        if listing.include_sub_attributes {
            let subs: Vec<Path> = attr
                .sub_attributes
                .iter()
                .filter(|sub| listing.matches(sub.is_required(), sub.mutability()))
                .map(|sub| Path::from_trusted(sub_attribute_urn(&text, &sub.name)))
                .collect();
            paths.push(Path::from_trusted(text));
            paths.extend(subs);
        } else {
            paths.push(Path::from_trusted(text));
        }
    }
}

/// Filters for [`ResourceDefinition::iter_paths`].
#[derive(Debug, Clone)]
pub struct PathListing {
    pub include_sub_attributes: bool,
    pub include_extensions: bool,
    /// Only attributes whose required flag is listed.
    pub required: Option<Vec<bool>>,
    /// Only attributes whose mutability is listed.
    pub mutability: Option<Vec<Mutability>>,
}

impl Default for PathListing {
    fn default() -> Self {
        Self {
            include_sub_attributes: true,
            include_extensions: true,
            required: None,
            mutability: None,
        }
    }
}

impl PathListing {
    fn matches(&self, required: bool, mutability: Mutability) -> bool {
        self.required.as_ref().is_none_or(|r| r.contains(&required))
            && self.mutability.as_ref().is_none_or(|m| m.contains(&mutability))
    }
}
