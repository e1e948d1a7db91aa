//! End-to-end scenarios and properties of the SCIM engine.

use hadrian_scim::scim::{
    AttributeSelection, Context, Path, PatchOpKind, PatchOperation, PatchRequest, Resource,
    ResourceRegistry, SCHEMA_ENTERPRISE_USER, SCHEMA_USER, ScimError, ScimErrorResponse,
    ScimErrorType, Value, group_definition, user_definition, user_with_enterprise_definition,
};
use rstest::rstest;
use serde_json::{Value as Json, json};

fn user(json: Json) -> Resource {
    Resource::from_json(user_with_enterprise_definition(), &json).unwrap()
}

fn primary_count(resource: &Resource, attribute: &str) -> usize {
    resource
        .attribute(attribute)
        .and_then(Value::as_multi)
        .map(|items| {
            items
                .iter()
                .filter(|item| {
                    item.as_complex()
                        .and_then(|c| c.get("primary"))
                        .and_then(Value::as_bool)
                        == Some(true)
                })
                .count()
        })
        .unwrap_or(0)
}

#[test]
fn test_add_sets_unset_attribute() {
    let mut resource = user(json!({"userName": "bjensen"}));
    assert!(resource.attribute("nickName").is_none());

    let patch = PatchRequest::new(vec![PatchOperation::add("nickName", json!("Babs"))]);
    assert!(patch.apply(&mut resource).unwrap());
    assert_eq!(resource.attribute("nickName"), Some(&Value::from("Babs")));
}

#[test]
fn test_new_primary_email_wins() {
    let mut resource = user(json!({
        "userName": "bjensen",
        "emails": [{"value": "a@x.com", "primary": true}]
    }));
    let patch = PatchRequest::new(vec![PatchOperation::add(
        "emails",
        json!({"value": "b@x.com", "primary": true}),
    )]);
    assert!(patch.apply(&mut resource).unwrap());

    let emails = resource.attribute("emails").unwrap().to_json();
    assert_eq!(
        emails,
        json!([
            {"value": "a@x.com", "primary": false},
            {"value": "b@x.com", "primary": true}
        ])
    );
    assert_eq!(primary_count(&resource, "emails"), 1);
}

#[test]
fn test_duplicate_member_add_is_unchanged() {
    let mut group =
        Resource::from_json(group_definition(), &json!({"displayName": "Admins", "members": []}))
            .unwrap();
    let patch = PatchRequest::new(vec![PatchOperation::add("members", json!({"value": "123"}))]);

    assert!(patch.apply(&mut group).unwrap());
    assert!(!patch.apply(&mut group).unwrap());
    assert_eq!(group.attribute("members").unwrap().to_json(), json!([{"value": "123"}]));
}

#[test]
fn test_creation_response_requires_id() {
    let resource = user(json!({"userName": "bjensen"}));
    let err = resource
        .to_json(Context::ResourceCreationResponse, &AttributeSelection::All)
        .unwrap_err();
    assert_eq!(err.scim_type(), Some(ScimErrorType::InvalidValue));
    assert!(err.detail().contains("'id'"));
    assert!(err.detail().contains("always"));
}

#[test]
fn test_removing_schemas_is_invalid_value() {
    let patch = PatchRequest::new(vec![PatchOperation::remove("schemas")]);
    let err = patch
        .validate(&user_definition(), Context::ResourcePatchRequest)
        .unwrap_err();
    assert!(matches!(err, ScimError::InvalidValue(_)));

    let mut resource = user(json!({"userName": "bjensen"}));
    assert!(matches!(patch.apply(&mut resource), Err(ScimError::InvalidValue(_))));
}

#[test]
fn test_enterprise_manager_value_resolution() {
    let path =
        Path::parse("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager.value")
            .unwrap()
            .bind(user_with_enterprise_definition());

    let attribute = path.attribute().unwrap();
    assert_eq!(attribute.name, "value");
    assert!(attribute.is_case_exact());

    let resource = user(json!({
        "userName": "bjensen",
        SCHEMA_ENTERPRISE_USER: {"manager": {"value": "26118915", "$ref": "../Users/26118915"}}
    }));
    assert_eq!(path.get(&resource).unwrap(), Some(Value::from("26118915")));
}

#[test]
fn test_default_round_trip() {
    let payload = json!({
        "schemas": [SCHEMA_USER, SCHEMA_ENTERPRISE_USER],
        "id": "2819c223",
        "userName": "bjensen",
        "name": {"formatted": "Ms. Barbara J Jensen III", "familyName": "Jensen"},
        "password": "t1meMa$heen",
        "phoneNumbers": [{"value": "555-555-8377", "type": "work"}],
        "meta": {"resourceType": "User", "created": "2010-01-23T04:56:22Z"},
        SCHEMA_ENTERPRISE_USER: {"costCenter": "4130"}
    });
    let resource = user(payload.clone());
    let encoded = resource.to_json(Context::Default, &AttributeSelection::All).unwrap();
    assert_eq!(encoded, payload);
    assert_eq!(user(encoded), resource);
}

#[test]
fn test_remove_twice_reports_unchanged() {
    let mut resource = user(json!({
        "userName": "bjensen",
        "emails": [{"value": "a@x.com"}],
        SCHEMA_ENTERPRISE_USER: {"division": "West"}
    }));
    for path in ["emails", &format!("{SCHEMA_ENTERPRISE_USER}:division")] {
        let patch = PatchRequest::new(vec![PatchOperation::remove(path)]);
        assert!(patch.apply(&mut resource).unwrap(), "{path}");
        let after_first = resource.clone();
        assert!(!patch.apply(&mut resource).unwrap(), "{path}");
        assert_eq!(resource, after_first);
    }
}

#[rstest]
#[case(AttributeSelection::All)]
#[case(AttributeSelection::include(["password"]))]
#[case(AttributeSelection::include(["urn:ietf:params:scim:schemas:core:2.0:User:password"]))]
#[case(AttributeSelection::exclude(["password"]))]
#[case(AttributeSelection::exclude(["userName"]))]
fn test_password_never_returned(#[case] selection: AttributeSelection) {
    let resource = user(json!({"id": "1", "userName": "bjensen", "password": "secret"}));
    for context in Context::ALL.into_iter().filter(|c| c.is_response()) {
        let rendered = resource.to_json(context, &selection).unwrap();
        assert!(rendered.get("password").is_none(), "{context}");
    }
}

#[test]
fn test_primary_exclusivity_across_patches() {
    let mut resource = user(json!({"userName": "bjensen"}));
    let operations = [
        PatchOperation::add("emails", json!({"value": "a@x.com", "primary": true})),
        PatchOperation::add("emails", json!({"value": "b@x.com"})),
        PatchOperation::add("emails", json!({"value": "c@x.com", "primary": true})),
        PatchOperation::replace("emails", json!([{"value": "d@x.com", "primary": true}])),
        PatchOperation::add("phoneNumbers", json!({"value": "555", "primary": true})),
        PatchOperation::add("phoneNumbers", json!({"value": "556", "primary": true})),
    ];
    for operation in operations {
        PatchRequest::new(vec![operation]).apply(&mut resource).unwrap();
        assert!(primary_count(&resource, "emails") <= 1);
        assert!(primary_count(&resource, "phoneNumbers") <= 1);
    }
}

#[rstest]
#[case("user_name")]
#[case("nick_name")]
#[case("preferred_language")]
#[case("phone_numbers")]
fn test_addressing_ignores_case(#[case] name: &str) {
    let definition = user_definition();
    let camel = hadrian_scim::scim::urn::to_camel(name);
    let resolve = |text: &str| {
        Path::parse(text)
            .unwrap()
            .bind(definition.clone())
            .attribute()
            .map(|attr| attr.name.clone())
    };
    let expected = resolve(&camel);
    assert!(expected.is_some());
    assert_eq!(resolve(&name.to_uppercase()), expected);
    assert_eq!(resolve(&name.to_lowercase()), expected);
}

#[test]
fn test_replacement_request_flow() {
    let original =
        user(json!({"id": "1", "userName": "bjensen", "meta": {"resourceType": "User"}}));
    let replacement = Resource::from_json_in(
        user_with_enterprise_definition(),
        &json!({
            "id": "1",
            "userName": "bjensen",
            "nickName": "Babs",
            "meta": {"resourceType": "User"}
        }),
        Context::ResourceReplacementRequest,
        Some(&original),
    )
    .unwrap();
    assert!(replacement.id().is_none());
    assert_eq!(replacement.attribute("nickName"), Some(&Value::from("Babs")));

    let err = Resource::from_json_in(
        user_with_enterprise_definition(),
        &json!({"userName": "bjensen"}),
        Context::ResourceReplacementRequest,
        None,
    )
    .unwrap_err();
    assert_eq!(err.scim_type(), None);
}

#[test]
fn test_registry_decode_then_patch_then_render() {
    let registry = ResourceRegistry::with_defaults();
    let mut resource = registry
        .decode(&json!({"schemas": [SCHEMA_USER], "id": "1", "userName": "bjensen"}))
        .unwrap();

    let patch: PatchRequest = serde_json::from_value(json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
        "Operations": [
            {"op": "Add", "path": "emails", "value": [{"value": "b@x.com", "type": "work"}]},
            {"op": "Replace", "value": {"displayName": "Babs Jensen"}},
            {
                "op": "add",
                "path": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber",
                "value": "701984"
            }
        ]
    }))
    .unwrap();
    assert_eq!(patch.operations[1].op, PatchOpKind::Replace);
    assert!(patch.apply(&mut resource).unwrap());

    let rendered = resource
        .to_json(Context::ResourcePatchResponse, &AttributeSelection::exclude(["emails"]))
        .unwrap();
    assert_eq!(rendered["schemas"], json!([SCHEMA_USER, SCHEMA_ENTERPRISE_USER]));
    assert_eq!(rendered["displayName"], "Babs Jensen");
    assert!(rendered.get("emails").is_none());
    assert_eq!(rendered[SCHEMA_ENTERPRISE_USER]["employeeNumber"], "701984");
}

#[rstest]
#[case(ScimError::Mutability("Attribute 'id' is readOnly".into()))]
#[case(ScimError::NoTarget("Remove operations require a path".into()))]
#[case(ScimError::Uniqueness("userName taken".into()))]
#[case(ScimError::bad_request("Replacement request validation requires the original resource"))]
fn test_errors_round_trip_through_protocol_message(#[case] error: ScimError) {
    let message = error.to_response();
    let wire = serde_json::to_value(&message).unwrap();
    let parsed: ScimErrorResponse = serde_json::from_value(wire).unwrap();
    let rebuilt = ScimError::from(parsed);
    assert_eq!(rebuilt.scim_type(), error.scim_type());
    assert_eq!(rebuilt.status_code(), error.status_code());
    assert_eq!(rebuilt.detail(), error.detail());
}

#[test]
fn test_pathless_remove_is_no_target() {
    let patch = PatchRequest::new(vec![PatchOperation {
        op: PatchOpKind::Remove,
        path: None,
        value: None,
    }]);
    let mut resource = user(json!({"userName": "bjensen"}));
    let err = patch.apply(&mut resource).unwrap_err();
    assert_eq!(err.scim_type(), Some(ScimErrorType::NoTarget));
}
