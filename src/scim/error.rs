//! SCIM 2.0 Error Types
//!
//! This module defines the SCIM error taxonomy (RFC 7644 Section 3.12, Table 9)
//! and the Error message it converts to and from.

use http::StatusCode;
use serde::{Deserialize, Serialize};

use super::types::SCHEMA_ERROR;

/// Errors raised by the SCIM core.
///
/// Every variant maps to a stable `scimType`, an HTTP status and a
/// human-readable detail, and converts losslessly to and from a
/// [`ScimErrorResponse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScimError {
    /// The filter syntax is invalid or the filter is unsupported
    #[error("{0}")]
    InvalidFilter(String),

    /// The query would return more results than the server allows
    #[error("{0}")]
    TooMany(String),

    /// A value violates a uniqueness constraint
    #[error("{0}")]
    Uniqueness(String),

    /// An attempt to modify a read-only or immutable attribute
    #[error("{0}")]
    Mutability(String),

    /// The request body is not parsable or violates the schema structure
    #[error("{0}")]
    InvalidSyntax(String),

    /// The path is malformed or names an unknown schema
    #[error("{0}")]
    InvalidPath(String),

    /// The path is well-formed but names an attribute that does not exist
    #[error("Attribute '{field}' not found in path '{path}'")]
    PathNotFound { path: String, field: String },

    /// The path did not yield an attribute that could be operated on
    #[error("{0}")]
    NoTarget(String),

    /// A required value is missing or a value is incompatible with its attribute
    #[error("{0}")]
    InvalidValue(String),

    /// The requested version is not supported
    #[error("{0}")]
    InvalidVersion(String),

    /// The request cannot be completed because it would disclose sensitive data
    #[error("{0}")]
    Sensitive(String),

    /// Any other failure, with its own HTTP status and no `scimType`
    #[error("{detail}")]
    Other { status: StatusCode, detail: String },
}

impl ScimError {
    /// Generic 400 error without a `scimType`.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        ScimError::Other {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    /// Error for a path segment that names no attribute.
    pub fn path_not_found(path: impl Into<String>, field: impl Into<String>) -> Self {
        ScimError::PathNotFound {
            path: path.into(),
            field: field.into(),
        }
    }

    /// The `scimType` of this error, if any.
    pub fn scim_type(&self) -> Option<ScimErrorType> {
        Some(match self {
            ScimError::InvalidFilter(_) => ScimErrorType::InvalidFilter,
            ScimError::TooMany(_) => ScimErrorType::TooMany,
            ScimError::Uniqueness(_) => ScimErrorType::Uniqueness,
            ScimError::Mutability(_) => ScimErrorType::Mutability,
            ScimError::InvalidSyntax(_) => ScimErrorType::InvalidSyntax,
            ScimError::InvalidPath(_) | ScimError::PathNotFound { .. } => {
                ScimErrorType::InvalidPath
            }
            ScimError::NoTarget(_) => ScimErrorType::NoTarget,
            ScimError::InvalidValue(_) => ScimErrorType::InvalidValue,
            ScimError::InvalidVersion(_) => ScimErrorType::InvalidVersion,
            ScimError::Sensitive(_) => ScimErrorType::Sensitive,
            ScimError::Other { .. } => return None,
        })
    }

    /// The HTTP status code of this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScimError::Uniqueness(_) => StatusCode::CONFLICT,
            ScimError::Other { status, .. } => *status,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Human-readable detail.
    pub fn detail(&self) -> String {
        self.to_string()
    }

    /// Whether this is a path error (malformed path, unknown schema or unknown attribute).
    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            ScimError::InvalidPath(_) | ScimError::PathNotFound { .. }
        )
    }

    /// Convert into the protocol Error message.
    pub fn to_response(&self) -> ScimErrorResponse {
        ScimErrorResponse::new(self.status_code(), self.scim_type(), self.detail())
    }
}

impl From<ScimErrorResponse> for ScimError {
    fn from(response: ScimErrorResponse) -> Self {
        let status = response.status_code();
        let detail = response.detail;
        match response.scim_type {
            Some(ScimErrorType::InvalidFilter) => ScimError::InvalidFilter(detail),
            Some(ScimErrorType::TooMany) => ScimError::TooMany(detail),
            Some(ScimErrorType::Uniqueness) => ScimError::Uniqueness(detail),
            Some(ScimErrorType::Mutability) => ScimError::Mutability(detail),
            Some(ScimErrorType::InvalidSyntax) => ScimError::InvalidSyntax(detail),
            Some(ScimErrorType::InvalidPath) => ScimError::InvalidPath(detail),
            Some(ScimErrorType::NoTarget) => ScimError::NoTarget(detail),
            Some(ScimErrorType::InvalidValue) => ScimError::InvalidValue(detail),
            Some(ScimErrorType::InvalidVersion) => ScimError::InvalidVersion(detail),
            Some(ScimErrorType::Sensitive) => ScimError::Sensitive(detail),
            None => ScimError::Other { status, detail },
        }
    }
}

impl From<&ScimError> for ScimErrorResponse {
    fn from(error: &ScimError) -> Self {
        error.to_response()
    }
}

/// SCIM error response per RFC 7644.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimErrorResponse {
    /// SCIM schema URIs (always contains the Error schema)
    pub schemas: Vec<String>,

    /// HTTP status code as a string (e.g., "400", "404")
    pub status: String,

    /// SCIM-specific error type (optional, per RFC 7644)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<ScimErrorType>,

    /// Human-readable error detail
    #[serde(default)]
    pub detail: String,
}

impl ScimErrorResponse {
    fn new(
        status: StatusCode,
        scim_type: Option<ScimErrorType>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            schemas: vec![SCHEMA_ERROR.to_string()],
            status: status.as_u16().to_string(),
            scim_type,
            detail: detail.into(),
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        self.status
            .parse::<u16>()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// SCIM error types per RFC 7644 Section 3.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimErrorType {
    /// Filter syntax is invalid or unsupported
    InvalidFilter,

    /// Too many results
    TooMany,

    /// Uniqueness constraint violated (e.g., duplicate userName)
    Uniqueness,

    /// Attempt to modify read-only or immutable attribute
    Mutability,

    /// Request body has invalid syntax
    InvalidSyntax,

    /// Path is malformed or unresolvable
    InvalidPath,

    /// PATCH operation without a usable target
    NoTarget,

    /// Attribute value is missing or invalid for its type
    InvalidValue,

    /// Unsupported version
    #[serde(rename = "invalidVers")]
    InvalidVersion,

    /// Request would disclose sensitive information
    Sensitive,
}

impl std::fmt::Display for ScimErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScimErrorType::InvalidFilter => "invalidFilter",
            ScimErrorType::TooMany => "tooMany",
            ScimErrorType::Uniqueness => "uniqueness",
            ScimErrorType::Mutability => "mutability",
            ScimErrorType::InvalidSyntax => "invalidSyntax",
            ScimErrorType::InvalidPath => "invalidPath",
            ScimErrorType::NoTarget => "noTarget",
            ScimErrorType::InvalidValue => "invalidValue",
            ScimErrorType::InvalidVersion => "invalidVers",
            ScimErrorType::Sensitive => "sensitive",
        };
        f.write_str(s)
    }
}

/// Result type for SCIM operations
pub type ScimResult<T> = Result<T, ScimError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_scim_error_invalid_filter() {
        let err = ScimError::InvalidFilter("The filter syntax is invalid".into()).to_response();

        assert_eq!(err.status, "400");
        assert_eq!(err.scim_type, Some(ScimErrorType::InvalidFilter));
        assert!(err.detail.contains("filter"));

        let json = serde_json::to_string_pretty(&err).unwrap();
        assert!(json.contains("\"scimType\": \"invalidFilter\""));
        assert!(json.contains("\"status\": \"400\""));
        assert!(json.contains(SCHEMA_ERROR));
    }

    #[test]
    fn test_scim_error_generic_omits_scim_type() {
        let err = ScimError::Other {
            status: StatusCode::NOT_FOUND,
            detail: "User with id '12345' not found".into(),
        }
        .to_response();

        assert_eq!(err.status, "404");
        assert_eq!(err.scim_type, None);

        let json = serde_json::to_string_pretty(&err).unwrap();
        assert!(!json.contains("scimType"));
    }

    #[test]
    fn test_scim_error_status_code() {
        assert_eq!(
            ScimError::bad_request("test").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScimError::Uniqueness("test".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ScimError::TooMany("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_path_not_found_is_invalid_path() {
        let err = ScimError::path_not_found("name.nope", "nope");
        assert!(err.is_path_error());
        assert_eq!(err.scim_type(), Some(ScimErrorType::InvalidPath));
        assert_eq!(err.detail(), "Attribute 'nope' not found in path 'name.nope'");
    }

    #[rstest]
    #[case(ScimError::InvalidFilter("bad filter".into()))]
    #[case(ScimError::TooMany("too many".into()))]
    #[case(ScimError::Uniqueness("userName taken".into()))]
    #[case(ScimError::Mutability("id is readOnly".into()))]
    #[case(ScimError::InvalidSyntax("not json".into()))]
    #[case(ScimError::InvalidPath("bad path".into()))]
    #[case(ScimError::NoTarget("no target".into()))]
    #[case(ScimError::InvalidValue("bad value".into()))]
    #[case(ScimError::InvalidVersion("stale".into()))]
    #[case(ScimError::Sensitive("sensitive".into()))]
    #[case(ScimError::Other { status: StatusCode::INTERNAL_SERVER_ERROR, detail: "boom".into() })]
    fn test_error_message_round_trip(#[case] err: ScimError) {
        let json = serde_json::to_value(err.to_response()).unwrap();
        let response: ScimErrorResponse = serde_json::from_value(json).unwrap();
        let back = ScimError::from(response);

        assert_eq!(back, err);
        assert_eq!(back.status_code(), err.status_code());
        assert_eq!(back.detail(), err.detail());
    }

    #[test]
    fn test_path_not_found_round_trip_keeps_kind_and_detail() {
        let err = ScimError::path_not_found("nope", "nope");
        let back = ScimError::from(err.to_response());

        assert_eq!(back.scim_type(), err.scim_type());
        assert_eq!(back.status_code(), err.status_code());
        assert_eq!(back.detail(), err.detail());
    }

    #[test]
    fn test_scim_error_type_display() {
        assert_eq!(format!("{}", ScimErrorType::InvalidFilter), "invalidFilter");
        assert_eq!(format!("{}", ScimErrorType::InvalidVersion), "invalidVers");
        assert_eq!(
            serde_json::to_value(ScimErrorType::InvalidVersion).unwrap(),
            "invalidVers"
        );
    }
}
