//! Resource instances and their JSON codec.
//!
//! A [`Resource`] is a mutable attribute tree conforming to a
//! [`ResourceDefinition`]. Root attributes and each present extension slot are
//! kept in separate [`Complex`] maps; the `schemas` attribute is derived from
//! which slots are present and re-synchronised after every mutation.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as Json};

use super::{
    context::{AttributeSelection, Context, OutputDecision, ResolvedSelection, output_policy},
    definition::{ResourceDefinition, Scope},
    error::{ScimError, ScimResult},
    schema::{SchemaAttribute, find_attribute},
    types::ScimListResponse,
    urn::{attribute_urn, normalize_name, strip_schema, sub_attribute_urn},
    validate,
    value::{Complex, DecodeOptions, Value, decode_complex},
};

/// A SCIM resource instance.
#[derive(Debug, Clone)]
pub struct Resource {
    definition: Arc<ResourceDefinition>,
    attributes: Complex,
    extensions: BTreeMap<String, Complex>,
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.definition, &other.definition)
            || self.definition.core_urn() == other.definition.core_urn())
            && self.attributes == other.attributes
            && self.extensions == other.extensions
    }
}

impl Resource {
    /// Create an empty resource of the given type.
    pub fn new(definition: Arc<ResourceDefinition>) -> Self {
        let mut resource = Self {
            definition,
            attributes: Complex::new(),
            extensions: BTreeMap::new(),
        };
        resource.sync_schemas();
        resource
    }

    pub fn definition(&self) -> &Arc<ResourceDefinition> {
        &self.definition
    }

    /// Root attributes, keyed by declared name.
    pub fn attributes(&self) -> &Complex {
        &self.attributes
    }

    /// Look up a root attribute by name, case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        let attr = self.definition.attribute(name)?;
        self.attributes.get(&attr.name)
    }

    /// Resource id, if assigned.
    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").and_then(Value::as_str)
    }

    /// Attributes of a present extension slot.
    pub fn extension(&self, urn: &str) -> Option<&Complex> {
        let (_, ext) = self.definition.extension(urn)?;
        self.extensions.get(&ext.schema.id)
    }

    /// Remove an extension slot, returning its attributes.
    pub fn remove_extension(&mut self, urn: &str) -> Option<Complex> {
        let id = self.definition.extension(urn)?.1.schema.id.clone();
        let removed = self.extensions.remove(&id);
        self.sync_schemas();
        removed
    }

    /// Root URN followed by the URN of every present extension.
    pub fn schemas(&self) -> Vec<String> {
        std::iter::once(self.definition.core_urn())
            .chain(
                self.definition
                    .extensions()
                    .iter()
                    .map(|ext| ext.schema.id.as_str())
                    .filter(|id| self.extensions.contains_key(*id)),
            )
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn sync_schemas(&mut self) {
        let schemas = self.schemas().into_iter().map(Value::Reference).collect();
        self.attributes.insert("schemas".to_string(), Value::Multi(schemas));
    }

    pub(crate) fn scope(&self, scope: Scope) -> Option<&Complex> {
        match scope {
            Scope::Core => Some(&self.attributes),
            Scope::Extension(i) => self.extensions.get(&self.definition.extensions()[i].schema.id),
        }
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut Complex {
        &mut self.attributes
    }

    /// Take an extension slot out for editing; an absent slot yields an empty one.
    pub(crate) fn take_extension(&mut self, index: usize) -> (Complex, bool) {
        let id = &self.definition.extensions()[index].schema.id;
        match self.extensions.remove(id) {
            Some(complex) => (complex, true),
            None => (Complex::new(), false),
        }
    }

    pub(crate) fn put_extension(&mut self, index: usize, complex: Complex) {
        let id = self.definition.extensions()[index].schema.id.clone();
        self.extensions.insert(id, complex);
        self.sync_schemas();
    }

    pub(crate) fn extension_mut(&mut self, index: usize) -> Option<&mut Complex> {
        let id = &self.definition.extensions()[index].schema.id;
        self.extensions.get_mut(id)
    }

    pub(crate) fn drop_extension(&mut self, index: usize) -> bool {
        let id = &self.definition.extensions()[index].schema.id;
        let removed = self.extensions.remove(id).is_some();
        self.sync_schemas();
        removed
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Decode a payload without any context policy.
    pub fn from_json(definition: Arc<ResourceDefinition>, json: &Json) -> ScimResult<Self> {
        Self::from_json_with(definition, json, DecodeOptions::default())
    }

    /// Decode a payload and validate it for `context`.
    ///
    /// `original` is required when `context` is a replacement request.
    pub fn from_json_in(
        definition: Arc<ResourceDefinition>,
        json: &Json,
        context: Context,
        original: Option<&Resource>,
    ) -> ScimResult<Self> {
        let mut resource = Self::from_json(definition, json)?;
        resource.validate(context, original)?;
        Ok(resource)
    }

    pub fn from_json_with(
        definition: Arc<ResourceDefinition>,
        json: &Json,
        options: DecodeOptions,
    ) -> ScimResult<Self> {
        let object = json.as_object().ok_or_else(|| {
            ScimError::InvalidSyntax("Resource payload must be a JSON object".into())
        })?;

        let mut resource = Self::new(definition);
        let mut root = Map::new();
        for (key, value) in object {
            if key.contains(':') {
                if let Some((index, ext)) = resource.definition.extension(key) {
                    if value.is_null() {
                        continue;
                    }
                    let fields = value.as_object().ok_or_else(|| {
                        ScimError::InvalidValue(format!("Extension '{key}' must be a JSON object"))
                    })?;
                    let complex = decode_complex(&ext.schema.attributes, fields, options)?;
                    resource.put_extension(index, complex);
                    continue;
                }
                if let Some(name) = strip_schema(key, resource.definition.core_urn())
                    && !name.is_empty()
                {
                    root.insert(name.to_string(), value.clone());
                    continue;
                }
            }
            root.insert(key.clone(), value.clone());
        }

        let decoded = decode_complex(resource.definition.attributes(), &root, options)?;
        resource.attributes.extend(decoded);
        resource.sync_schemas();
        Ok(resource)
    }

    /// Apply the input policy of `context`, dropping values the context
    /// tolerates and rejecting values it forbids.
    pub fn validate(&mut self, context: Context, original: Option<&Resource>) -> ScimResult<()> {
        validate::validate(self, context, original)
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Render the resource for `context`.
    ///
    /// In response contexts the resource must satisfy the response input
    /// rules first (e.g. an `always` attribute such as `id` must be set).
    pub fn to_json(&self, context: Context, selection: &AttributeSelection) -> ScimResult<Json> {
        if context.is_response() {
            validate::check_returned(self, context)?;
        }
        let selection = selection.resolve(self.definition.core_urn());
        Ok(self.encode(context, &selection))
    }

    fn encode(&self, context: Context, selection: &ResolvedSelection) -> Json {
        let definition = &self.definition;
        let mut object = encode_complex(
            definition.attributes(),
            &self.attributes,
            definition.core_urn(),
            true,
            context,
            selection,
        );
        object.insert(
            "schemas".to_string(),
            Json::Array(self.schemas().into_iter().map(Json::String).collect()),
        );

        for ext in definition.extensions() {
            let Some(complex) = self.extensions.get(&ext.schema.id) else {
                continue;
            };
            let slot = normalize_name(&ext.schema.id);
            if !selection.admits(slot_decision(context), &slot) {
                continue;
            }
            let fields = encode_complex(
                &ext.schema.attributes,
                complex,
                &ext.schema.id,
                true,
                context,
                selection,
            );
            object.insert(ext.schema.id.clone(), Json::Object(fields));
        }
        Json::Object(object)
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.encode(Context::Default, &ResolvedSelection::All).serialize(serializer)
    }
}

/// Extension slots behave like `returned: default` attributes.
fn slot_decision(context: Context) -> OutputDecision {
    output_policy(context, &SchemaAttribute::complex("", Vec::new()))
}

/// Encode a complex value, applying the output policy to every attribute.
///
/// `top` tells whether `parent` is a schema URN (attributes are joined with
/// `:`) or an attribute URN (sub-attributes are joined with `.`).
fn encode_complex(
    attributes: &[SchemaAttribute],
    complex: &Complex,
    parent: &str,
    top: bool,
    context: Context,
    selection: &ResolvedSelection,
) -> Map<String, Json> {
    let mut object = Map::new();
    for attr in attributes {
        let Some(value) = complex.get(&attr.name) else {
            continue;
        };
        let urn = if top {
            attribute_urn(parent, &attr.name)
        } else {
            sub_attribute_urn(parent, &attr.name)
        };
        if !selection.admits(output_policy(context, attr), &normalize_name(&urn)) {
            continue;
        }
        let encoded = match value {
            Value::Complex(inner) => {
                let fields =
                    encode_complex(&attr.sub_attributes, inner, &urn, false, context, selection);
                if fields.is_empty() {
                    continue;
                }
                Json::Object(fields)
            }
            Value::Multi(items) if attr.is_complex() => {
                let elements: Vec<Json> = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::Complex(inner) => {
                            let fields = encode_complex(
                                &attr.sub_attributes,
                                inner,
                                &urn,
                                false,
                                context,
                                selection,
                            );
                            (!fields.is_empty() || inner.is_empty()).then_some(Json::Object(fields))
                        }
                        other => Some(other.to_json()),
                    })
                    .collect();
                if elements.is_empty() {
                    continue;
                }
                Json::Array(elements)
            }
            other => other.to_json(),
        };
        object.insert(attr.name.clone(), encoded);
    }
    object
}

/// Find the attribute definition for a root-level key, including
/// schema-qualified core keys.
pub(crate) fn root_attribute<'a>(
    definition: &'a ResourceDefinition,
    key: &str,
) -> Option<&'a SchemaAttribute> {
    match strip_schema(key, definition.core_urn()) {
        Some(name) if !name.is_empty() => find_attribute(definition.attributes(), name),
        _ => definition.attribute(key),
    }
}

/// Render a page of resources as a ListResponse for `context`.
pub fn list_response(
    resources: &[Resource],
    context: Context,
    selection: &AttributeSelection,
    total_results: u32,
    start_index: u32,
) -> ScimResult<ScimListResponse<Json>> {
    let rendered = resources
        .iter()
        .map(|resource| resource.to_json(context, selection))
        .collect::<ScimResult<Vec<_>>>()?;
    Ok(ScimListResponse::from_page(rendered, total_results, start_index))
}
