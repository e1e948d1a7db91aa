//! Built-in resource schemas (RFC 7643 Section 4 and Section 8.7.1).

use std::sync::Arc;

use once_cell::sync::Lazy;

use super::{
    definition::ResourceDefinition,
    schema::{Mutability, Returned, SchemaAttribute, ScimSchema, Uniqueness},
    types::{SCHEMA_ENTERPRISE_USER, SCHEMA_GROUP, SCHEMA_USER},
};

/// The `value`/`display`/`type`/`primary` shape shared by most
/// multi-valued User attributes.
fn multi_valued(name: &str, value: SchemaAttribute, types: &[&str]) -> SchemaAttribute {
    SchemaAttribute::complex(
        name,
        vec![
            value,
            SchemaAttribute::string("display"),
            SchemaAttribute::string("type").with_canonical_values(types),
            SchemaAttribute::boolean("primary"),
        ],
    )
    .multi()
}

/// Core User schema.
pub static USER_SCHEMA: Lazy<Arc<ScimSchema>> = Lazy::new(|| {
    Arc::new(
        ScimSchema::new(SCHEMA_USER, "User")
            .with_description("User Account")
            .with_attributes(vec![
                SchemaAttribute::string("userName")
                    .with_required()
                    .with_uniqueness(Uniqueness::Server)
                    .with_description("Unique identifier for the User"),
                SchemaAttribute::complex(
                    "name",
                    vec![
                        SchemaAttribute::string("formatted"),
                        SchemaAttribute::string("familyName"),
                        SchemaAttribute::string("givenName"),
                        SchemaAttribute::string("middleName"),
                        SchemaAttribute::string("honorificPrefix"),
                        SchemaAttribute::string("honorificSuffix"),
                    ],
                ),
                SchemaAttribute::string("displayName"),
                SchemaAttribute::string("nickName"),
                SchemaAttribute::reference("profileUrl", &["external"]),
                SchemaAttribute::string("title"),
                SchemaAttribute::string("userType"),
                SchemaAttribute::string("preferredLanguage"),
                SchemaAttribute::string("locale"),
                SchemaAttribute::string("timezone"),
                SchemaAttribute::boolean("active"),
                SchemaAttribute::string("password")
                    .with_mutability(Mutability::WriteOnly)
                    .with_returned(Returned::Never),
                multi_valued(
                    "emails",
                    SchemaAttribute::string("value"),
                    &["work", "home", "other"],
                ),
                multi_valued(
                    "phoneNumbers",
                    SchemaAttribute::string("value"),
                    &["work", "home", "mobile", "fax", "pager", "other"],
                ),
                multi_valued(
                    "ims",
                    SchemaAttribute::string("value"),
                    &["aim", "gtalk", "icq", "xmpp", "msn", "skype", "qq", "yahoo"],
                ),
                multi_valued(
                    "photos",
                    SchemaAttribute::reference("value", &["external"]).with_case_exact(),
                    &["photo", "thumbnail"],
                ),
                SchemaAttribute::complex(
                    "addresses",
                    vec![
                        SchemaAttribute::string("formatted"),
                        SchemaAttribute::string("streetAddress"),
                        SchemaAttribute::string("locality"),
                        SchemaAttribute::string("region"),
                        SchemaAttribute::string("postalCode"),
                        SchemaAttribute::string("country"),
                        SchemaAttribute::string("type")
                            .with_canonical_values(&["work", "home", "other"]),
                        SchemaAttribute::boolean("primary"),
                    ],
                )
                .multi(),
                SchemaAttribute::complex(
                    "groups",
                    vec![
                        SchemaAttribute::string("value").with_mutability(Mutability::ReadOnly),
                        SchemaAttribute::reference("$ref", &["User", "Group"])
                            .with_mutability(Mutability::ReadOnly),
                        SchemaAttribute::string("display").with_mutability(Mutability::ReadOnly),
                        SchemaAttribute::string("type")
                            .with_mutability(Mutability::ReadOnly)
                            .with_canonical_values(&["direct", "indirect"]),
                    ],
                )
                .multi()
                .with_mutability(Mutability::ReadOnly),
                multi_valued("entitlements", SchemaAttribute::string("value"), &[]),
                multi_valued("roles", SchemaAttribute::string("value"), &[]),
                multi_valued(
                    "x509Certificates",
                    SchemaAttribute::binary("value").with_case_exact(),
                    &[],
                ),
            ]),
    )
});

/// Core Group schema.
pub static GROUP_SCHEMA: Lazy<Arc<ScimSchema>> = Lazy::new(|| {
    Arc::new(
        ScimSchema::new(SCHEMA_GROUP, "Group")
            .with_description("Group")
            .with_attributes(vec![
                SchemaAttribute::string("displayName"),
                SchemaAttribute::complex(
                    "members",
                    vec![
                        SchemaAttribute::string("value").with_mutability(Mutability::Immutable),
                        SchemaAttribute::reference("$ref", &["User", "Group"])
                            .with_mutability(Mutability::Immutable),
                        SchemaAttribute::string("type")
                            .with_mutability(Mutability::Immutable)
                            .with_canonical_values(&["User", "Group"]),
                        SchemaAttribute::string("display").with_mutability(Mutability::ReadOnly),
                    ],
                )
                .multi(),
            ]),
    )
});

/// Enterprise User extension schema.
pub static ENTERPRISE_USER_SCHEMA: Lazy<Arc<ScimSchema>> = Lazy::new(|| {
    Arc::new(
        ScimSchema::new(SCHEMA_ENTERPRISE_USER, "EnterpriseUser")
            .with_description("Enterprise User")
            .with_attributes(vec![
                SchemaAttribute::string("employeeNumber"),
                SchemaAttribute::string("costCenter"),
                SchemaAttribute::string("organization"),
                SchemaAttribute::string("division"),
                SchemaAttribute::string("department"),
                SchemaAttribute::complex(
                    "manager",
                    vec![
                        SchemaAttribute::string("value").with_required().with_case_exact(),
                        SchemaAttribute::reference("$ref", &["User"]).with_required(),
                        SchemaAttribute::string("displayName")
                            .with_mutability(Mutability::ReadOnly),
                    ],
                ),
            ]),
    )
});

static USER: Lazy<Arc<ResourceDefinition>> =
    Lazy::new(|| Arc::new(ResourceDefinition::new("User", "/Users", USER_SCHEMA.clone())));

static USER_WITH_ENTERPRISE: Lazy<Arc<ResourceDefinition>> = Lazy::new(|| {
    Arc::new(
        ResourceDefinition::new("User", "/Users", USER_SCHEMA.clone())
            .with_extension(ENTERPRISE_USER_SCHEMA.clone(), false),
    )
});

static GROUP: Lazy<Arc<ResourceDefinition>> =
    Lazy::new(|| Arc::new(ResourceDefinition::new("Group", "/Groups", GROUP_SCHEMA.clone())));

/// User without extensions.
pub fn user_definition() -> Arc<ResourceDefinition> {
    USER.clone()
}

/// User accepting the Enterprise User extension.
pub fn user_with_enterprise_definition() -> Arc<ResourceDefinition> {
    USER_WITH_ENTERPRISE.clone()
}

/// Group without extensions.
pub fn group_definition() -> Arc<ResourceDefinition> {
    GROUP.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_schema_annotations() {
        let user = user_definition();
        assert!(user.attribute("userName").unwrap().is_required());
        assert_eq!(user.attribute("password").unwrap().returned(), Returned::Never);
        assert_eq!(user.attribute("groups").unwrap().mutability(), Mutability::ReadOnly);
        assert_eq!(user.attribute("id").unwrap().returned(), Returned::Always);
        assert!(user.attribute("emails").unwrap().has_primary());
        assert!(!user.attribute("groups").unwrap().has_primary());
    }

    #[test]
    fn test_group_member_annotations() {
        let group = group_definition();
        let members = group.attribute("members").unwrap();
        assert_eq!(members.sub_attribute("value").unwrap().mutability(), Mutability::Immutable);
        assert_eq!(members.sub_attribute("ref").unwrap().name, "$ref");
        assert_eq!(members.sub_attribute("display").unwrap().mutability(), Mutability::ReadOnly);
    }

    #[test]
    fn test_schema_discovery_document() {
        let value = serde_json::to_value(&**ENTERPRISE_USER_SCHEMA).unwrap();
        assert_eq!(value["id"], SCHEMA_ENTERPRISE_USER);
        assert_eq!(value["attributes"][5]["name"], "manager");
        assert_eq!(value["attributes"][5]["subAttributes"][0]["required"], true);
    }
}
