//! Attribute paths (RFC 7644 Section 3.10).
//!
//! A [`Path`] is a validated, case-insensitive attribute reference such as
//! `userName`, `name.familyName` or
//! `urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager.value`.
//! On its own it only knows its syntax. Binding it to a
//! [`ResourceDefinition`] gives a [`BoundPath`], which resolves the path
//! against the schema and reads or writes resource instances.
//!
//! Value filters (`emails[type eq "work"]`) are accepted by the parser but
//! never resolve to an attribute.

use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
    sync::Arc,
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tracing::debug;

use super::{
    definition::{Location, ResourceDefinition, Scope},
    error::{ScimError, ScimResult},
    resource::{Resource, root_attribute},
    schema::{SchemaAttribute, find_attribute},
    value::{Complex, DecodeOptions, Value, decode_complex},
};

static VALID_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[a-zA-Z][a-zA-Z0-9._:\-\[\]"=\s]*$"#).expect("static regex"));

/// A syntactically valid attribute path.
///
/// Equality and hashing ignore ASCII case.
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path(String);

impl Path {
    /// Parse and validate a path. The empty path addresses the resource root.
    pub fn parse(text: &str) -> ScimResult<Self> {
        check_syntax(text)
            .map_err(|reason| ScimError::InvalidPath(format!("Invalid path '{text}': {reason}")))?;
        Ok(Path(text.to_string()))
    }

    /// The resource root.
    pub fn root() -> Self {
        Path(String::new())
    }

    /// Wrap text built from schema names, which is valid by construction.
    pub(crate) fn from_trusted(text: String) -> Self {
        Path(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text before the last `:`, if any.
    pub fn schema(&self) -> Option<&str> {
        self.0.rsplit_once(':').map(|(schema, _)| schema)
    }

    /// Text after the last `:`, or the whole path.
    pub fn attr(&self) -> &str {
        self.0.rsplit_once(':').map_or(self.0.as_str(), |(_, attr)| attr)
    }

    /// The dot-separated segments of [`Path::attr`].
    pub fn parts(&self) -> Vec<&str> {
        match self.attr() {
            "" => Vec::new(),
            attr => attr.split('.').collect(),
        }
    }

    /// Whether `other` lies strictly below this path (`emails` is a prefix of
    /// `emails.value`, a schema URN of its attributes).
    pub fn is_prefix_of(&self, other: &str) -> bool {
        let this = self.0.to_lowercase();
        let other = other.to_lowercase();
        other.len() > this.len()
            && other.starts_with(&this)
            && matches!(other.as_bytes()[this.len()], b'.' | b':')
    }

    /// Whether this path lies strictly below `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        Path(prefix.to_string()).is_prefix_of(&self.0)
    }

    /// Associate the path with a resource definition.
    ///
    /// Binding does not check that the path exists.
    pub fn bind(self, definition: Arc<ResourceDefinition>) -> BoundPath {
        BoundPath {
            path: self,
            definition,
            strict: true,
        }
    }
}

fn check_syntax(text: &str) -> Result<(), &'static str> {
    let Some(first) = text.chars().next() else {
        return Ok(());
    };
    if first.is_ascii_digit() {
        return Err("paths cannot start with a digit");
    }
    if text.contains("..") {
        return Err("paths cannot contain double dots");
    }
    if !VALID_PATH.is_match(text) {
        return Err("the path contains invalid characters");
    }
    if text.ends_with(':') {
        return Err("paths cannot end with a colon");
    }
    let attr = text.rsplit_once(':').map_or(text, |(_, attr)| attr);
    if attr.split('.').any(|part| part.starts_with(|c: char| c.is_ascii_digit())) {
        return Err("attribute names cannot start with a digit");
    }
    if let Some((urn, _)) = text.rsplit_once(':') {
        if !urn.to_lowercase().starts_with("urn:") {
            return Err("the schema prefix does not start with 'urn:'");
        }
        if urn.split(':').count() < 3 {
            return Err("the schema prefix must have at least 3 parts");
        }
    }
    Ok(())
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Path {
    type Err = ScimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = ScimError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        check_syntax(&value)
            .map_err(|reason| ScimError::InvalidPath(format!("Invalid path '{value}': {reason}")))?;
        Ok(Path(value))
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.0
    }
}

// =============================================================================
// Bound Paths
// =============================================================================

/// A path associated with a resource definition.
///
/// Instance operations resolve against the instance's own definition, so a
/// path bound to one definition can be applied to resources of another.
#[derive(Debug, Clone)]
pub struct BoundPath {
    path: Path,
    definition: Arc<ResourceDefinition>,
    strict: bool,
}

impl BoundPath {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn definition(&self) -> &Arc<ResourceDefinition> {
        &self.definition
    }

    /// Turn path errors into "nothing there" instead of failing.
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Resolve the path against the bound definition.
    pub fn resolve(&self) -> ScimResult<Arc<Location>> {
        self.definition.locate(&self.path)
    }

    /// The attribute the path names.
    ///
    /// `None` for unresolvable paths and for paths naming a whole scope (the
    /// root or an extension slot).
    pub fn attribute(&self) -> Option<&SchemaAttribute> {
        let location = self.resolve().ok()?;
        self.definition.location_attribute(&location)
    }

    /// Fully qualified attribute URN of the path.
    pub fn urn(&self) -> Option<String> {
        let location = self.resolve().ok()?;
        Some(self.definition.location_urn(&location))
    }

    /// Read the value at this path. Missing intermediates yield `None`.
    pub fn get(&self, resource: &Resource) -> ScimResult<Option<Value>> {
        self.recover(self.get_strict(resource))
    }

    /// Write `json` at this path, reporting whether the resource changed.
    ///
    /// With `is_add` on a multi-valued attribute the values are appended,
    /// skipping elements already present. `null` clears the attribute.
    pub fn set(&self, resource: &mut Resource, json: &Json, is_add: bool) -> ScimResult<bool> {
        self.recover(self.set_strict(resource, json, is_add))
    }

    /// Clear the attribute at this path, or with `matching` remove equal
    /// elements from a multi-valued attribute.
    pub fn delete(&self, resource: &mut Resource, matching: Option<&Json>) -> ScimResult<bool> {
        self.recover(self.delete_strict(resource, matching))
    }

    fn recover<T: Default>(&self, result: ScimResult<T>) -> ScimResult<T> {
        match result {
            Err(err) if !self.strict && err.is_path_error() => {
                debug!(path = %self.path, error = %err, "Ignoring unresolvable path");
                Ok(T::default())
            }
            other => other,
        }
    }

    fn get_strict(&self, resource: &Resource) -> ScimResult<Option<Value>> {
        let definition = resource.definition();
        let location = definition.locate(&self.path)?;
        let Some(complex) = resource.scope(location.scope) else {
            return Ok(None);
        };
        let Some((last, intermediates)) = location.segments.split_last() else {
            return Ok(Some(Value::Complex(complex.clone())));
        };

        let mut current = complex;
        for segment in intermediates {
            match current.get(segment) {
                Some(Value::Complex(inner)) => current = inner,
                _ => return Ok(None),
            }
        }
        Ok(current.get(last).cloned())
    }

    fn set_strict(&self, resource: &mut Resource, json: &Json, is_add: bool) -> ScimResult<bool> {
        let definition = resource.definition().clone();
        let location = definition.locate(&self.path)?;

        if location.segments.is_empty() {
            return match location.scope {
                Scope::Core => match json {
                    Json::Object(object) => merge_root(resource, object, is_add),
                    _ if self.path.is_empty() => Ok(false),
                    _ => Err(ScimError::InvalidPath(format!(
                        "Path '{}' addresses the resource and needs an object value",
                        self.path
                    ))),
                },
                Scope::Extension(index) => set_slot(resource, index, json),
            };
        }

        let attributes = definition.scope_attributes(location.scope);
        let changed = match location.scope {
            Scope::Core => {
                set_in(attributes, resource.attributes_mut(), &location.segments, json, is_add)?
            }
            Scope::Extension(index) => {
                let (mut slot, existed) = resource.take_extension(index);
                let result = set_in(attributes, &mut slot, &location.segments, json, is_add);
                if existed || matches!(result, Ok(true)) {
                    resource.put_extension(index, slot);
                }
                result?
            }
        };
        resource.sync_schemas();
        Ok(changed)
    }

    fn delete_strict(&self, resource: &mut Resource, matching: Option<&Json>) -> ScimResult<bool> {
        let definition = resource.definition().clone();
        let location = definition.locate(&self.path)?;

        if location.segments.is_empty() {
            return match location.scope {
                Scope::Core => Err(ScimError::InvalidPath(format!(
                    "Path '{}' addresses the resource root, which cannot be removed",
                    self.path
                ))),
                Scope::Extension(index) => Ok(resource.drop_extension(index)),
            };
        }

        let attributes = definition.scope_attributes(location.scope);
        let complex = match location.scope {
            Scope::Core => Some(resource.attributes_mut()),
            Scope::Extension(index) => resource.extension_mut(index),
        };
        let Some(complex) = complex else {
            return Ok(false);
        };
        let changed = delete_in(attributes, complex, &location.segments, matching)?;
        resource.sync_schemas();
        Ok(changed)
    }
}

fn lookup<'a>(attributes: &'a [SchemaAttribute], segment: &str) -> ScimResult<&'a SchemaAttribute> {
    find_attribute(attributes, segment).ok_or_else(|| ScimError::path_not_found(segment, segment))
}

/// Write at `segments` below `complex`, creating intermediate complex values
/// only when something changes. Intermediates emptied by the write are pruned.
fn set_in(
    attributes: &[SchemaAttribute],
    complex: &mut Complex,
    segments: &[String],
    json: &Json,
    is_add: bool,
) -> ScimResult<bool> {
    let attr = lookup(attributes, &segments[0])?;
    let rest = &segments[1..];
    if rest.is_empty() {
        return assign(attr, complex, json, is_add);
    }

    match complex.get_mut(&attr.name) {
        Some(Value::Complex(inner)) => {
            let changed = set_in(&attr.sub_attributes, inner, rest, json, is_add)?;
            if inner.is_empty() {
                complex.remove(&attr.name);
            }
            Ok(changed)
        }
        // Collections are terminal
        Some(_) => Ok(false),
        None => {
            let mut inner = Complex::new();
            let changed = set_in(&attr.sub_attributes, &mut inner, rest, json, is_add)?;
            if !inner.is_empty() {
                complex.insert(attr.name.clone(), Value::Complex(inner));
            }
            Ok(changed)
        }
    }
}

/// Assign one attribute of `complex` from JSON.
fn assign(
    attr: &SchemaAttribute,
    complex: &mut Complex,
    json: &Json,
    is_add: bool,
) -> ScimResult<bool> {
    let value = Value::from_json(attr, json, DecodeOptions::default())?;

    if is_add && attr.multi_valued {
        let Some(Value::Multi(items)) = value else {
            return Ok(false);
        };
        let mut current = match complex.remove(&attr.name) {
            Some(Value::Multi(current)) => current,
            Some(other) => vec![other],
            None => Vec::new(),
        };
        let before = current.len();
        for item in items {
            if !current.contains(&item) {
                current.push(item);
            }
        }
        let changed = current.len() != before;
        if !current.is_empty() {
            complex.insert(attr.name.clone(), Value::Multi(current));
        }
        return Ok(changed);
    }

    Ok(match value {
        None => complex.remove(&attr.name).is_some(),
        Some(value) if complex.get(&attr.name) == Some(&value) => false,
        Some(value) => {
            complex.insert(attr.name.clone(), value);
            true
        }
    })
}

fn delete_in(
    attributes: &[SchemaAttribute],
    complex: &mut Complex,
    segments: &[String],
    matching: Option<&Json>,
) -> ScimResult<bool> {
    let attr = lookup(attributes, &segments[0])?;
    let rest = &segments[1..];

    if !rest.is_empty() {
        let Some(Value::Complex(inner)) = complex.get_mut(&attr.name) else {
            return Ok(false);
        };
        let changed = delete_in(&attr.sub_attributes, inner, rest, matching)?;
        if inner.is_empty() {
            complex.remove(&attr.name);
        }
        return Ok(changed);
    }

    let Some(matching) = matching else {
        return Ok(complex.remove(&attr.name).is_some());
    };
    let Some(Value::Multi(items)) = complex.get_mut(&attr.name) else {
        return Ok(false);
    };
    let targets = match matching {
        Json::Array(elements) => elements
            .iter()
            .map(|element| Value::element_from_json(attr, element, DecodeOptions::default()))
            .collect::<ScimResult<Vec<_>>>()?,
        element => vec![Value::element_from_json(attr, element, DecodeOptions::default())?],
    };

    let before = items.len();
    items.retain(|item| !targets.contains(item));
    let changed = items.len() != before;
    if items.is_empty() {
        complex.remove(&attr.name);
    }
    Ok(changed)
}

/// Merge an object into the resource root. Unknown keys are ignored and
/// extension URN keys replace that slot.
fn merge_root(
    resource: &mut Resource,
    object: &Map<String, Json>,
    is_add: bool,
) -> ScimResult<bool> {
    let definition = resource.definition().clone();
    let mut changed = false;
    for (key, json) in object {
        if let Some((index, _)) = definition.extension(key) {
            changed |= set_slot(resource, index, json)?;
            continue;
        }
        match root_attribute(&definition, key) {
            // Derived from the present extension slots
            Some(attr) if attr.name == "schemas" => {}
            Some(attr) => changed |= assign(attr, resource.attributes_mut(), json, is_add)?,
            None => debug!(attribute = %key, "Ignoring unknown attribute in root merge"),
        }
    }
    resource.sync_schemas();
    Ok(changed)
}

/// Replace an extension slot with an object, or remove it with `null`.
fn set_slot(resource: &mut Resource, index: usize, json: &Json) -> ScimResult<bool> {
    let definition = resource.definition().clone();
    let ext = &definition.extensions()[index];
    match json {
        Json::Null => Ok(resource.drop_extension(index)),
        Json::Object(object) => {
            let complex = decode_complex(&ext.schema.attributes, object, DecodeOptions::default())?;
            if resource.scope(Scope::Extension(index)) == Some(&complex) {
                return Ok(false);
            }
            resource.put_extension(index, complex);
            Ok(true)
        }
        other => Err(ScimError::InvalidValue(format!(
            "Extension '{}' must be a JSON object, got {other}",
            ext.schema.id
        ))),
    }
}
