//! SCIM 2.0 Protocol Types
//!
//! Schema URIs, the ListResponse message and the discovery documents
//! (ServiceProviderConfig, ResourceType) per RFC 7643/7644.

use serde::{Deserialize, Serialize};

// =============================================================================
// Schema URIs
// =============================================================================

/// SCIM Core User schema URI
pub const SCHEMA_USER: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// SCIM Core Group schema URI
pub const SCHEMA_GROUP: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

/// SCIM Enterprise User extension schema URI
pub const SCHEMA_ENTERPRISE_USER: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

/// SCIM ListResponse schema URI
pub const SCHEMA_LIST_RESPONSE: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

/// SCIM Error schema URI
pub const SCHEMA_ERROR: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// SCIM PatchOp schema URI
pub const SCHEMA_PATCH_OP: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// SCIM ServiceProviderConfig schema URI
pub const SCHEMA_SERVICE_PROVIDER_CONFIG: &str =
    "urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig";

/// SCIM ResourceType schema URI
pub const SCHEMA_RESOURCE_TYPE: &str = "urn:ietf:params:scim:schemas:core:2.0:ResourceType";

/// SCIM Schema schema URI
pub const SCHEMA_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Schema";

// =============================================================================
// Protocol Messages (RFC 7644)
// =============================================================================

/// A page of query results (RFC 7644 Section 3.4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListResponse<T> {
    pub schemas: Vec<String>,

    /// Results matching the query across all pages
    pub total_results: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<u32>,

    /// 1-based index of the first result of this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u32>,

    #[serde(rename = "Resources", default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<T>,
}

impl<T> ScimListResponse<T> {
    /// Wrap one page of results. A `start_index` below 1 is read as 1, and
    /// counts beyond `u32::MAX` saturate.
    pub fn from_page(resources: Vec<T>, total_results: u32, start_index: u32) -> Self {
        let items = saturating_count(resources.len());
        Self {
            schemas: vec![SCHEMA_LIST_RESPONSE.to_string()],
            total_results: total_results.max(items),
            items_per_page: Some(items),
            start_index: Some(start_index.max(1)),
            resources,
        }
    }
}

fn saturating_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

// =============================================================================
// Discovery (RFC 7643 Section 6)
// =============================================================================

/// `ResourceType` discovery document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    pub schemas: Vec<String>,
    pub id: String,
    pub name: String,
    /// Relative endpoint, e.g. `/Users`
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Core schema URN
    pub schema: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_extensions: Vec<SchemaExtension>,
}

/// Extension schema declared by a [`ResourceType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaExtension {
    pub schema: String,
    pub required: bool,
}

/// `ServiceProviderConfig` discovery document (RFC 7643 Section 5).
///
/// The default advertises what this engine implements: PATCH, and nothing
/// that needs a server around it (bulk, filtering, sorting, ETags).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceProviderConfig {
    pub schemas: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_uri: Option<String>,
    pub patch: Supported,
    pub bulk: BulkSupport,
    pub filter: FilterSupport,
    pub change_password: Supported,
    pub sort: Supported,
    pub etag: Supported,
    pub authentication_schemes: Vec<AuthenticationScheme>,
}

impl Default for ServiceProviderConfig {
    fn default() -> Self {
        Self {
            schemas: vec![SCHEMA_SERVICE_PROVIDER_CONFIG.to_string()],
            documentation_uri: None,
            patch: Supported::yes(),
            bulk: BulkSupport::default(),
            filter: FilterSupport::default(),
            change_password: Supported::no(),
            sort: Supported::no(),
            etag: Supported::no(),
            authentication_schemes: Vec::new(),
        }
    }
}

impl ServiceProviderConfig {
    pub fn with_documentation_uri(mut self, uri: impl Into<String>) -> Self {
        self.documentation_uri = Some(uri.into());
        self
    }

    /// Advertise filtering, capped at `max_results` per response.
    pub fn with_filter(mut self, max_results: u32) -> Self {
        self.filter = FilterSupport {
            supported: true,
            max_results,
        };
        self
    }

    pub fn with_bulk(mut self, max_operations: u32, max_payload_size: u32) -> Self {
        self.bulk = BulkSupport {
            supported: true,
            max_operations,
            max_payload_size,
        };
        self
    }

    pub fn with_authentication_scheme(mut self, scheme: AuthenticationScheme) -> Self {
        self.authentication_schemes.push(scheme);
        self
    }
}

/// `{"supported": bool}` capability flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supported {
    pub supported: bool,
}

impl Supported {
    pub fn yes() -> Self {
        Self { supported: true }
    }

    pub fn no() -> Self {
        Self { supported: false }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSupport {
    pub supported: bool,
    pub max_operations: u32,
    pub max_payload_size: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSupport {
    pub supported: bool,
    pub max_results: u32,
}

/// Authentication scheme kinds listed by RFC 7643 Section 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticationSchemeType {
    OAuth,
    OAuth2,
    OAuthBearerToken,
    HttpBasic,
    HttpDigest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationScheme {
    #[serde(rename = "type")]
    pub scheme_type: AuthenticationSchemeType,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

impl AuthenticationScheme {
    /// OAuth 2.0 bearer tokens (RFC 6750).
    pub fn oauth_bearer() -> Self {
        Self {
            scheme_type: AuthenticationSchemeType::OAuthBearerToken,
            name: "OAuth Bearer Token".to_string(),
            description: "Authentication scheme using the OAuth Bearer Token Standard".to_string(),
            spec_uri: Some("https://www.rfc-editor.org/info/rfc6750".to_string()),
            documentation_uri: None,
            primary: None,
        }
    }

    /// HTTP Basic authentication (RFC 7617).
    pub fn http_basic() -> Self {
        Self {
            scheme_type: AuthenticationSchemeType::HttpBasic,
            name: "HTTP Basic".to_string(),
            description: "Authentication scheme using the HTTP Basic Standard".to_string(),
            spec_uri: Some("https://www.rfc-editor.org/info/rfc7617".to_string()),
            documentation_uri: None,
            primary: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = Some(true);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::scim::resources::{group_definition, user_with_enterprise_definition};

    #[test]
    fn test_list_response_page() {
        let page = vec![json!({"id": "1"}), json!({"id": "2"})];
        let response = ScimListResponse::from_page(page, 40, 11);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["schemas"], json!([SCHEMA_LIST_RESPONSE]));
        assert_eq!(value["totalResults"], 40);
        assert_eq!(value["itemsPerPage"], 2);
        assert_eq!(value["startIndex"], 11);
        assert_eq!(value["Resources"][1]["id"], "2");
    }

    #[test]
    fn test_list_response_bounds() {
        let response = ScimListResponse::from_page(vec![json!({}), json!({}), json!({})], 1, 0);
        assert_eq!(response.total_results, 3);
        assert_eq!(response.start_index, Some(1));

        let empty: ScimListResponse<serde_json::Value> =
            ScimListResponse::from_page(Vec::new(), 0, 1);
        let value = serde_json::to_value(&empty).unwrap();
        assert!(value.get("Resources").is_none());

        let parsed: ScimListResponse<serde_json::Value> = serde_json::from_value(json!({
            "schemas": [SCHEMA_LIST_RESPONSE],
            "totalResults": 0
        }))
        .unwrap();
        assert_eq!(parsed.items_per_page, None);
        assert!(parsed.resources.is_empty());
    }

    #[test]
    fn test_counts_saturate() {
        assert_eq!(saturating_count(7), 7);
        assert_eq!(saturating_count(u32::MAX as usize), u32::MAX);
        assert_eq!(saturating_count(usize::MAX), u32::MAX);
    }

    #[test]
    fn test_resource_type_documents() {
        let user = serde_json::to_value(user_with_enterprise_definition().resource_type()).unwrap();
        assert_eq!(user["schemas"], json!([SCHEMA_RESOURCE_TYPE]));
        assert_eq!(user["endpoint"], "/Users");
        assert_eq!(user["schema"], SCHEMA_USER);
        assert_eq!(
            user["schemaExtensions"],
            json!([{"schema": SCHEMA_ENTERPRISE_USER, "required": false}])
        );

        let group = serde_json::to_value(group_definition().resource_type()).unwrap();
        assert_eq!(group["schema"], SCHEMA_GROUP);
        assert!(group.get("schemaExtensions").is_none());
    }

    #[test]
    fn test_service_provider_config_defaults() {
        let config = ServiceProviderConfig::default();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["schemas"], json!([SCHEMA_SERVICE_PROVIDER_CONFIG]));
        assert_eq!(value["patch"], json!({"supported": true}));
        assert_eq!(
            value["bulk"],
            json!({"supported": false, "maxOperations": 0, "maxPayloadSize": 0})
        );
        assert_eq!(value["filter"], json!({"supported": false, "maxResults": 0}));
        assert_eq!(value["changePassword"], json!({"supported": false}));
        assert_eq!(value["authenticationSchemes"], json!([]));
        assert!(value.get("documentationUri").is_none());
    }

    #[test]
    fn test_service_provider_config_builders() {
        let config = ServiceProviderConfig::default()
            .with_documentation_uri("https://example.com/scim")
            .with_filter(200)
            .with_bulk(10, 1_048_576)
            .with_authentication_scheme(AuthenticationScheme::oauth_bearer().primary())
            .with_authentication_scheme(AuthenticationScheme::http_basic());

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["documentationUri"], "https://example.com/scim");
        assert_eq!(value["filter"], json!({"supported": true, "maxResults": 200}));
        assert_eq!(value["bulk"]["maxOperations"], 10);
        assert_eq!(value["authenticationSchemes"][0]["type"], "oauthbearertoken");
        assert_eq!(value["authenticationSchemes"][0]["primary"], true);
        assert_eq!(value["authenticationSchemes"][1]["type"], "httpbasic");
        assert!(value["authenticationSchemes"][1].get("primary").is_none());

        let parsed: ServiceProviderConfig = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_service_provider_config_partial_document() {
        let parsed: ServiceProviderConfig = serde_json::from_value(json!({
            "schemas": [SCHEMA_SERVICE_PROVIDER_CONFIG],
            "patch": {"supported": false},
            "authenticationSchemes": [{
                "type": "httpdigest",
                "name": "HTTP Digest",
                "description": "Digest access authentication"
            }]
        }))
        .unwrap();
        assert!(!parsed.patch.supported);
        assert!(!parsed.sort.supported);
        assert_eq!(
            parsed.authentication_schemes[0].scheme_type,
            AuthenticationSchemeType::HttpDigest
        );
    }
}
