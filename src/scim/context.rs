//! Context-driven attribute policy (RFC 7643 Section 2.2, RFC 7644 Section 3.4.2.5).
//!
//! The same resource shape is validated and rendered differently depending on
//! which protocol exchange it takes part in. A [`Context`] names that exchange;
//! [`input_policy`] and [`output_policy`] map a context and an attribute's
//! annotations to a decision.

use std::fmt;

use tracing::debug;

use super::{
    error::{ScimError, ScimResult},
    path::Path,
    schema::{Mutability, Returned, SchemaAttribute},
    urn::{is_descendant, normalize_name, qualify},
};

/// The protocol exchange a payload belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Context {
    /// No policy is enforced.
    #[default]
    Default,
    ResourceCreationRequest,
    ResourceCreationResponse,
    ResourceQueryRequest,
    ResourceQueryResponse,
    ResourceReplacementRequest,
    ResourceReplacementResponse,
    SearchRequest,
    SearchResponse,
    ResourcePatchRequest,
    ResourcePatchResponse,
}

impl Context {
    pub const ALL: [Context; 11] = [
        Context::Default,
        Context::ResourceCreationRequest,
        Context::ResourceCreationResponse,
        Context::ResourceQueryRequest,
        Context::ResourceQueryResponse,
        Context::ResourceReplacementRequest,
        Context::ResourceReplacementResponse,
        Context::SearchRequest,
        Context::SearchResponse,
        Context::ResourcePatchRequest,
        Context::ResourcePatchResponse,
    ];

    pub fn is_request(self) -> bool {
        matches!(
            self,
            Context::ResourceCreationRequest
                | Context::ResourceQueryRequest
                | Context::ResourceReplacementRequest
                | Context::SearchRequest
                | Context::ResourcePatchRequest
        )
    }

    pub fn is_response(self) -> bool {
        matches!(
            self,
            Context::ResourceCreationResponse
                | Context::ResourceQueryResponse
                | Context::ResourceReplacementResponse
                | Context::SearchResponse
                | Context::ResourcePatchResponse
        )
    }

    /// Contexts in which a client writes attribute values.
    fn is_write_request(self) -> bool {
        matches!(
            self,
            Context::ResourceCreationRequest | Context::ResourceReplacementRequest
        )
    }

    /// Contexts in which a client only reads.
    fn is_read_request(self) -> bool {
        matches!(self, Context::ResourceQueryRequest | Context::SearchRequest)
    }

    /// Contexts that require `required` attributes to be present.
    fn enforces_required(self) -> bool {
        matches!(
            self,
            Context::ResourceCreationRequest
                | Context::ResourceReplacementRequest
                | Context::ResourcePatchRequest
        )
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Context::Default => "default",
            Context::ResourceCreationRequest => "resource creation request",
            Context::ResourceCreationResponse => "resource creation response",
            Context::ResourceQueryRequest => "resource query request",
            Context::ResourceQueryResponse => "resource query response",
            Context::ResourceReplacementRequest => "resource replacement request",
            Context::ResourceReplacementResponse => "resource replacement response",
            Context::SearchRequest => "search request",
            Context::SearchResponse => "search response",
            Context::ResourcePatchRequest => "resource patch request",
            Context::ResourcePatchResponse => "resource patch response",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Policy Tables
// =============================================================================

/// What to do with an attribute on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputDecision {
    Allow,
    /// Silently discard the value.
    Drop,
    Reject(Violation),
}

/// Why an input attribute was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    ReadOnly,
    WriteOnly,
    Immutable,
    Required,
    ReturnedNever,
    ReturnedAlways,
}

impl Violation {
    /// Build the protocol error for `attribute` violating this rule in `context`.
    pub fn to_error(self, attribute: &str, context: Context) -> ScimError {
        match self {
            Violation::ReadOnly => ScimError::Mutability(format!(
                "Attribute '{attribute}' has mutability 'readOnly' but this is not valid in \
                 {context} context"
            )),
            Violation::WriteOnly => ScimError::Mutability(format!(
                "Attribute '{attribute}' has mutability 'writeOnly' but this is not valid in \
                 {context} context"
            )),
            Violation::Immutable => ScimError::Mutability(format!(
                "Attribute '{attribute}' is immutable but the request value is different than the \
                 original value"
            )),
            Violation::Required => ScimError::InvalidValue(format!(
                "Attribute '{attribute}' is required but value is missing or null"
            )),
            Violation::ReturnedNever => ScimError::InvalidValue(format!(
                "Attribute '{attribute}' has returnability 'never' but value is set"
            )),
            Violation::ReturnedAlways => ScimError::InvalidValue(format!(
                "Attribute '{attribute}' has returnability 'always' but value is missing or null"
            )),
        }
    }
}

/// Input decision for one attribute, given whether a value is present.
///
/// The immutable rule needs the original instance and is applied by the
/// validator on top of this table.
pub fn input_policy(context: Context, attribute: &SchemaAttribute, present: bool) -> InputDecision {
    let mutability = attribute.mutability();

    if present {
        if mutability == Mutability::ReadOnly {
            match context {
                Context::ResourceCreationRequest => {
                    return InputDecision::Reject(Violation::ReadOnly);
                }
                Context::ResourceReplacementRequest => return InputDecision::Drop,
                _ => {}
            }
        }
        if mutability == Mutability::WriteOnly && context.is_read_request() {
            return InputDecision::Reject(Violation::WriteOnly);
        }
        if context.is_response() && attribute.returned() == Returned::Never {
            return InputDecision::Reject(Violation::ReturnedNever);
        }
    } else {
        if attribute.is_required() && context.enforces_required() {
            return InputDecision::Reject(Violation::Required);
        }
        if context.is_response() && attribute.returned() == Returned::Always {
            return InputDecision::Reject(Violation::ReturnedAlways);
        }
    }

    InputDecision::Allow
}

/// How an attribute is treated on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDecision {
    AlwaysInclude,
    AlwaysExclude,
    IncludeByDefault,
    IncludeIfRequested,
}

/// Output decision for one attribute.
pub fn output_policy(context: Context, attribute: &SchemaAttribute) -> OutputDecision {
    if context.is_request() {
        let mutability = attribute.mutability();
        let omitted = (context.is_write_request() && mutability == Mutability::ReadOnly)
            || (context.is_read_request() && mutability == Mutability::WriteOnly);
        return if omitted {
            OutputDecision::AlwaysExclude
        } else {
            OutputDecision::AlwaysInclude
        };
    }

    if context.is_response() {
        return match attribute.returned() {
            Returned::Always => OutputDecision::AlwaysInclude,
            Returned::Never => OutputDecision::AlwaysExclude,
            Returned::Default => OutputDecision::IncludeByDefault,
            Returned::Request => OutputDecision::IncludeIfRequested,
        };
    }

    OutputDecision::AlwaysInclude
}

// =============================================================================
// Attribute Selection
// =============================================================================

/// The `attributes` / `excludedAttributes` parameters of a query.
///
/// The two lists are mutually exclusive (RFC 7644 Section 3.4.2.5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AttributeSelection {
    #[default]
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl AttributeSelection {
    pub fn include<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeSelection::Include(attributes.into_iter().map(Into::into).collect())
    }

    pub fn exclude<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeSelection::Exclude(attributes.into_iter().map(Into::into).collect())
    }

    /// Build a selection from the two optional query parameters.
    pub fn from_lists(
        attributes: Option<Vec<String>>,
        excluded_attributes: Option<Vec<String>>,
    ) -> ScimResult<Self> {
        let attributes = attributes.filter(|a| !a.is_empty());
        let excluded_attributes = excluded_attributes.filter(|a| !a.is_empty());
        match (attributes, excluded_attributes) {
            (Some(_), Some(_)) => Err(ScimError::InvalidValue(
                "'attributes' and 'excludedAttributes' are mutually exclusive".into(),
            )),
            (Some(included), None) => Ok(AttributeSelection::Include(included)),
            (None, Some(excluded)) => Ok(AttributeSelection::Exclude(excluded)),
            (None, None) => Ok(AttributeSelection::All),
        }
    }

    /// Qualify and normalize the entries against the resource's core schema.
    ///
    /// Entries that are not valid paths, or that carry a value filter, are
    /// ignored.
    pub(crate) fn resolve(&self, core_schema: &str) -> ResolvedSelection {
        let normalize = |entries: &[String]| -> Vec<String> {
            entries
                .iter()
                .filter_map(|entry| match Path::parse(entry) {
                    Ok(path) if !path.is_empty() && !path.as_str().contains(['[', ']']) => {
                        Some(normalize_name(&qualify(path.as_str(), core_schema)))
                    }
                    _ => {
                        debug!(attribute = %entry, "Ignoring invalid attribute selection entry");
                        None
                    }
                })
                .collect()
        };
        match self {
            AttributeSelection::All => ResolvedSelection::All,
            AttributeSelection::Include(entries) => ResolvedSelection::Include(normalize(entries)),
            AttributeSelection::Exclude(entries) => ResolvedSelection::Exclude(normalize(entries)),
        }
    }
}

/// An [`AttributeSelection`] with normalized, schema-qualified entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResolvedSelection {
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl ResolvedSelection {
    /// Whether an output decision admits the attribute with normalized URN `urn`.
    pub(crate) fn admits(&self, decision: OutputDecision, urn: &str) -> bool {
        match decision {
            OutputDecision::AlwaysInclude => true,
            OutputDecision::AlwaysExclude => false,
            OutputDecision::IncludeByDefault => match self {
                ResolvedSelection::All => true,
                ResolvedSelection::Include(entries) => {
                    entries.is_empty() || Self::related(entries, urn)
                }
                ResolvedSelection::Exclude(entries) => !entries
                    .iter()
                    .any(|entry| entry == urn || is_descendant(urn, entry)),
            },
            // Only an exact entry requests the attribute, not a parent or child
            OutputDecision::IncludeIfRequested => match self {
                ResolvedSelection::Include(entries) => entries.iter().any(|entry| entry == urn),
                _ => false,
            },
        }
    }

    /// The URN itself, an ancestor, or a descendant is listed.
    fn related(entries: &[String], urn: &str) -> bool {
        entries
            .iter()
            .any(|entry| entry == urn || is_descendant(urn, entry) || is_descendant(entry, urn))
    }
}
