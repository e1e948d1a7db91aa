//! SCIM 2.0 resource model, attribute policy engine, attribute paths and
//! PATCH engine (RFC 7643 / RFC 7644).
//!
//! ```
//! use hadrian_scim::scim::{
//!     AttributeSelection, Context, PatchOperation, PatchRequest, Resource, user_definition,
//! };
//! use serde_json::json;
//!
//! let payload = json!({"id": "1", "userName": "bjensen"});
//! let mut user = Resource::from_json(user_definition(), &payload)?;
//! let patch = PatchRequest::new(vec![PatchOperation::add("nickName", json!("Babs"))]);
//! assert!(patch.apply(&mut user)?);
//!
//! let rendered = user.to_json(Context::ResourceQueryResponse, &AttributeSelection::All)?;
//! assert_eq!(rendered["nickName"], "Babs");
//! # Ok::<(), hadrian_scim::scim::ScimError>(())
//! ```

pub mod config;
pub mod scim;

pub use config::{ConfigError, DecodeConfig, PatchConfig, ScimConfig};
pub use scim::{ScimError, ScimResult};
