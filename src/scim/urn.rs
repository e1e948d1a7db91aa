//! Attribute naming and URN helpers (RFC 7643 Section 2.1 and Section 10.2).

use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\W_]+").expect("static regex"));

/// Normalize an attribute name or URN for comparison.
///
/// Attribute names are case-insensitive and punctuation-insensitive
/// (`userName`, `UserName` and `user_name` are equivalent, `$ref` matches
/// `ref`). Anything containing a `:` is a schema-qualified name and is only
/// lower-cased, so URN separators survive.
pub fn normalize_name(name: &str) -> String {
    if name.contains(':') {
        name.to_lowercase()
    } else {
        NON_WORD.replace_all(name, "").to_lowercase()
    }
}

/// Convert a snake_case identifier to camelCase. `$ref` is left untouched.
pub fn to_camel(name: &str) -> String {
    if name.starts_with('$') {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for (i, c) in name.chars().enumerate() {
        if c == '_' {
            upper = i > 0;
            continue;
        }
        if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// URN of a top-level attribute of a schema.
pub fn attribute_urn(schema: &str, name: &str) -> String {
    format!("{schema}:{name}")
}

/// URN of a sub-attribute of a complex attribute.
pub fn sub_attribute_urn(parent: &str, name: &str) -> String {
    format!("{parent}.{name}")
}

/// Whether `child` names an attribute strictly below `ancestor`.
///
/// Both URNs must already be normalized. The boundary must be a `.` or `:`
/// so `urn:x:name` is not an ancestor of `urn:x:nameSuffix`.
pub fn is_descendant(child: &str, ancestor: &str) -> bool {
    child.len() > ancestor.len()
        && child.starts_with(ancestor)
        && matches!(child.as_bytes()[ancestor.len()], b'.' | b':')
}

/// Qualify a possibly bare attribute reference with a schema URN.
pub fn qualify(reference: &str, schema: &str) -> String {
    if reference.contains(':') {
        reference.to_string()
    } else {
        attribute_urn(schema, reference)
    }
}

/// Whether `path` starts with `schema` (case-insensitive) on a `:` or end boundary.
///
/// Returns the remainder after the separator.
pub fn strip_schema<'a>(path: &'a str, schema: &str) -> Option<&'a str> {
    let head = path.get(..schema.len())?;
    if !head.eq_ignore_ascii_case(schema) {
        return None;
    }
    let rest = &path[schema.len()..];
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(':')
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("userName", "username")]
    #[case("UserName", "username")]
    #[case("user_name", "username")]
    #[case("$ref", "ref")]
    #[case("x509Certificates", "x509certificates")]
    #[case(
        "urn:ietf:params:scim:schemas:core:2.0:User:userName",
        "urn:ietf:params:scim:schemas:core:2.0:user:username"
    )]
    fn test_normalize_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(input), expected);
    }

    #[rstest]
    #[case("user_name", "userName")]
    #[case("display_name", "displayName")]
    #[case("x509_certificates", "x509Certificates")]
    #[case("$ref", "$ref")]
    #[case("value", "value")]
    fn test_to_camel(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(to_camel(input), expected);
    }

    #[test]
    fn test_is_descendant() {
        assert!(is_descendant("urn:x:user:name.givenname", "urn:x:user:name"));
        assert!(is_descendant("urn:x:user:name", "urn:x:user"));
        assert!(!is_descendant("urn:x:user:nameother", "urn:x:user:name"));
        assert!(!is_descendant("urn:x:user:name", "urn:x:user:name"));
    }

    #[test]
    fn test_strip_schema() {
        let core = "urn:ietf:params:scim:schemas:core:2.0:User";
        assert_eq!(
            strip_schema("urn:ietf:params:scim:schemas:core:2.0:user:name.givenName", core),
            Some("name.givenName")
        );
        assert_eq!(strip_schema(core, core), Some(""));
        assert_eq!(strip_schema("urn:ietf:params:scim:schemas:core:2.0:UserX", core), None);
        assert_eq!(strip_schema("userName", core), None);
    }
}
