//! SCIM 2.0 Protocol Implementation
//!
//! This module provides the resource model and protocol semantics of SCIM 2.0
//! (System for Cross-domain Identity Management): typed attribute metadata,
//! context-driven validation and rendering, attribute paths, and PATCH.
//!
//! ## RFC References
//!
//! - RFC 7643: SCIM Core Schema
//! - RFC 7644: SCIM Protocol
//!
//! ## Module Structure
//!
//! - [`schema`]: Attribute definitions and their annotations
//! - [`definition`]: Resource types (core schema, common attributes, extensions)
//! - [`resources`]: Built-in User, Group and Enterprise User definitions
//! - [`context`]: Per-context input and output policy
//! - [`resource`]: Resource instances and their JSON codec
//! - [`validate`]: Input policy enforcement on instances
//! - [`path`]: Attribute path parsing and resolution
//! - [`patch`]: SCIM PATCH request validation and execution
//! - [`registry`]: Resource type lookup and two-phase decoding
//! - [`types`]: Schema URIs and simple protocol messages
//! - [`error`]: SCIM-specific error responses per RFC 7644

pub mod context;
pub mod definition;
pub mod error;
pub mod patch;
pub mod path;
pub mod registry;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod types;
pub mod urn;
pub mod validate;
pub mod value;

pub use context::{
    AttributeSelection, Context, InputDecision, OutputDecision, Violation, input_policy,
    output_policy,
};
pub use definition::{
    ExtensionDefinition, Location, PathListing, ResourceDefinition, Scope, common_attributes,
};
pub use error::*;
pub use patch::{PatchOpKind, PatchOperation, PatchRequest};
pub use path::{BoundPath, Path};
pub use registry::ResourceRegistry;
pub use resource::{Resource, list_response};
pub use resources::{group_definition, user_definition, user_with_enterprise_definition};
pub use schema::{AttributeType, Mutability, Returned, SchemaAttribute, ScimSchema, Uniqueness};
pub use types::*;
pub use value::{Complex, DecodeOptions, Value};
