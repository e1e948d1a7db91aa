//! SCIM 2.0 Schema Definitions
//!
//! Attribute metadata per RFC 7643 Section 2.2 and Section 7. Every attribute
//! carries an [`Annotations`] record whose unset entries fall back to the
//! RFC defaults, so the effective value of an annotation is always either
//! explicit or the default for its kind.

use serde::{Deserialize, Serialize};

use super::{types::SCHEMA_SCHEMA, urn::normalize_name};

// =============================================================================
// Annotation Kinds
// =============================================================================

/// SCIM attribute data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    String,
    Boolean,
    Decimal,
    Integer,
    DateTime,
    Reference,
    Complex,
    Binary,
}

/// SCIM attribute mutability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    ReadOnly,
    #[default]
    ReadWrite,
    Immutable,
    WriteOnly,
}

/// SCIM attribute return behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Returned {
    Always,
    Never,
    #[default]
    Default,
    Request,
}

/// SCIM attribute uniqueness constraint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Uniqueness {
    #[default]
    None,
    Server,
    Global,
}

/// Explicit annotations of one attribute.
///
/// `None` means "not declared"; the effective value is the kind's default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutability: Option<Mutability>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned: Option<Returned>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_exact: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniqueness: Option<Uniqueness>,
}

// =============================================================================
// Attribute Definitions
// =============================================================================

/// SCIM attribute definition within a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAttribute {
    /// Attribute name, as emitted on the wire
    pub name: String,

    /// Attribute data type
    #[serde(rename = "type")]
    pub attr_type: AttributeType,

    /// Whether this is a multi-valued attribute
    #[serde(default)]
    pub multi_valued: bool,

    /// Description of the attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared annotations
    #[serde(flatten)]
    pub annotations: Annotations,

    /// Suggested values (e.g. "work", "home")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub canonical_values: Vec<String>,

    /// Resource types a reference may point to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_types: Vec<String>,

    /// Sub-attributes for complex types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_attributes: Vec<SchemaAttribute>,
}

impl SchemaAttribute {
    /// Create an attribute of the given type with default annotations.
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            multi_valued: false,
            description: None,
            annotations: Annotations::default(),
            canonical_values: Vec::new(),
            reference_types: Vec::new(),
            sub_attributes: Vec::new(),
        }
    }

    /// Create a string attribute
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::String)
    }

    /// Create a boolean attribute
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Boolean)
    }

    /// Create an integer attribute
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Integer)
    }

    /// Create a decimal attribute
    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Decimal)
    }

    /// Create a dateTime attribute
    pub fn date_time(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::DateTime)
    }

    /// Create a binary attribute
    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Binary)
    }

    /// Create a reference attribute pointing to the given resource types
    pub fn reference(name: impl Into<String>, reference_types: &[&str]) -> Self {
        let mut attr = Self::new(name, AttributeType::Reference);
        attr.reference_types = reference_types.iter().map(|s| s.to_string()).collect();
        attr
    }

    /// Create a complex attribute with sub-attributes
    pub fn complex(name: impl Into<String>, sub_attributes: Vec<SchemaAttribute>) -> Self {
        let mut attr = Self::new(name, AttributeType::Complex);
        attr.sub_attributes = sub_attributes;
        attr
    }

    /// Mark the attribute as multi-valued.
    pub fn multi(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mutability(mut self, mutability: Mutability) -> Self {
        self.annotations.mutability = Some(mutability);
        self
    }

    pub fn with_returned(mut self, returned: Returned) -> Self {
        self.annotations.returned = Some(returned);
        self
    }

    pub fn with_required(mut self) -> Self {
        self.annotations.required = Some(true);
        self
    }

    pub fn with_case_exact(mut self) -> Self {
        self.annotations.case_exact = Some(true);
        self
    }

    pub fn with_uniqueness(mut self, uniqueness: Uniqueness) -> Self {
        self.annotations.uniqueness = Some(uniqueness);
        self
    }

    pub fn with_canonical_values(mut self, values: &[&str]) -> Self {
        self.canonical_values = values.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Effective mutability.
    pub fn mutability(&self) -> Mutability {
        self.annotations.mutability.unwrap_or_default()
    }

    /// Effective returned behavior.
    pub fn returned(&self) -> Returned {
        self.annotations.returned.unwrap_or_default()
    }

    /// Effective required flag.
    pub fn is_required(&self) -> bool {
        self.annotations.required.unwrap_or(false)
    }

    /// Effective caseExact flag.
    pub fn is_case_exact(&self) -> bool {
        self.annotations.case_exact.unwrap_or(false)
    }

    /// Effective uniqueness.
    pub fn uniqueness(&self) -> Uniqueness {
        self.annotations.uniqueness.unwrap_or_default()
    }

    pub fn is_complex(&self) -> bool {
        self.attr_type == AttributeType::Complex
    }

    /// Look up a sub-attribute by name, case-insensitively.
    pub fn sub_attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        find_attribute(&self.sub_attributes, name)
    }

    /// Whether this is a collection whose elements carry a boolean `primary`.
    pub fn has_primary(&self) -> bool {
        self.multi_valued
            && self.is_complex()
            && self
                .sub_attribute("primary")
                .is_some_and(|attr| attr.attr_type == AttributeType::Boolean)
    }
}

/// Find an attribute by name, matching per RFC 7643 Section 2.1.
///
/// Value filters (`emails[type eq "work"]`) never name an attribute.
pub fn find_attribute<'a>(
    attributes: &'a [SchemaAttribute],
    name: &str,
) -> Option<&'a SchemaAttribute> {
    if name.contains(['[', ']']) {
        return None;
    }
    let wanted = normalize_name(name);
    attributes
        .iter()
        .find(|attr| normalize_name(&attr.name) == wanted)
}

// =============================================================================
// Schema Definitions
// =============================================================================

/// SCIM Schema definition.
///
/// Describes the structure of a SCIM resource or extension, including its
/// attributes. Schemas are declared once and shared behind `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimSchema {
    /// Always contains SCHEMA_SCHEMA
    pub schemas: Vec<String>,

    /// Schema URI (e.g., "urn:ietf:params:scim:schemas:core:2.0:User")
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Description of the schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Attribute definitions
    pub attributes: Vec<SchemaAttribute>,
}

impl ScimSchema {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schemas: vec![SCHEMA_SCHEMA.to_string()],
            id: id.into(),
            name: name.into(),
            description: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Vec<SchemaAttribute>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Look up a top-level attribute by name, case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        find_attribute(&self.attributes, name)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_annotation_defaults() {
        let attr = SchemaAttribute::string("nickName");
        assert_eq!(attr.mutability(), Mutability::ReadWrite);
        assert_eq!(attr.returned(), Returned::Default);
        assert_eq!(attr.uniqueness(), Uniqueness::None);
        assert!(!attr.is_required());
        assert!(!attr.is_case_exact());
    }

    #[test]
    fn test_explicit_annotations() {
        let attr = SchemaAttribute::string("id")
            .with_mutability(Mutability::ReadOnly)
            .with_returned(Returned::Always)
            .with_uniqueness(Uniqueness::Global)
            .with_case_exact()
            .with_required();

        assert_eq!(attr.mutability(), Mutability::ReadOnly);
        assert_eq!(attr.returned(), Returned::Always);
        assert_eq!(attr.uniqueness(), Uniqueness::Global);
        assert!(attr.is_case_exact());
        assert!(attr.is_required());
    }

    #[test]
    fn test_schema_attribute_serialization() {
        let attr = SchemaAttribute::complex(
            "emails",
            vec![
                SchemaAttribute::string("value"),
                SchemaAttribute::boolean("primary"),
            ],
        )
        .multi()
        .with_description("Email addresses");

        let value = serde_json::to_value(&attr).unwrap();
        assert_eq!(value["type"], json!("complex"));
        assert_eq!(value["multiValued"], json!(true));
        assert_eq!(value["subAttributes"][1]["type"], json!("boolean"));
        // Undeclared annotations stay off the wire
        assert!(value.get("mutability").is_none());

        let parsed: SchemaAttribute = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, attr);
    }

    #[test]
    fn test_annotations_deserialize_flat() {
        let attr: SchemaAttribute = serde_json::from_value(json!({
            "name": "password",
            "type": "string",
            "mutability": "writeOnly",
            "returned": "never",
            "caseExact": false
        }))
        .unwrap();

        assert_eq!(attr.mutability(), Mutability::WriteOnly);
        assert_eq!(attr.returned(), Returned::Never);
        assert_eq!(attr.annotations.case_exact, Some(false));
        assert_eq!(attr.annotations.required, None);
    }

    #[test]
    fn test_find_attribute_is_case_insensitive() {
        let attrs = vec![
            SchemaAttribute::string("userName"),
            SchemaAttribute::reference("$ref", &["User"]),
        ];
        assert_eq!(find_attribute(&attrs, "USERNAME").unwrap().name, "userName");
        assert_eq!(find_attribute(&attrs, "user_name").unwrap().name, "userName");
        assert_eq!(find_attribute(&attrs, "ref").unwrap().name, "$ref");
        assert!(find_attribute(&attrs, "nickName").is_none());
        assert!(find_attribute(&attrs, "user[Name]").is_none());
        assert!(find_attribute(&attrs, "userName[value eq \"x\"]").is_none());
    }

    #[test]
    fn test_has_primary() {
        let emails = SchemaAttribute::complex(
            "emails",
            vec![
                SchemaAttribute::string("value"),
                SchemaAttribute::boolean("primary"),
            ],
        )
        .multi();
        assert!(emails.has_primary());

        let members =
            SchemaAttribute::complex("members", vec![SchemaAttribute::string("value")]).multi();
        assert!(!members.has_primary());
    }
}
