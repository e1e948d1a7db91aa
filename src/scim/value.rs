//! Attribute values of resource instances.
//!
//! A [`Value`] is typed by the [`SchemaAttribute`] it belongs to. Conversion
//! from JSON always goes through the attribute definition so instances only
//! ever hold values of their declared type. Absent values are modelled by the
//! key being missing from its [`Complex`]; collections are never stored empty.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value as Json};
use tracing::debug;

use super::{
    error::{ScimError, ScimResult},
    schema::{AttributeType, SchemaAttribute, find_attribute},
};

/// A complex value: attribute name (as declared) to value.
pub type Complex = BTreeMap<String, Value>;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    DateTime(DateTime<Utc>),
    Reference(String),
    Binary(Vec<u8>),
    Complex(Complex),
    Multi(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Reference(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<&Complex> {
        match self {
            Value::Complex(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_multi(&self) -> Option<&[Value]> {
        match self {
            Value::Multi(items) => Some(items),
            _ => None,
        }
    }

    /// Convert a JSON value for `attr`, honoring multi-valuedness.
    ///
    /// Returns `Ok(None)` for `null`, an empty list and an empty object, all
    /// of which mean "absent". A scalar given to a multi-valued attribute is
    /// wrapped into a singleton list.
    pub fn from_json(
        attr: &SchemaAttribute,
        json: &Json,
        options: DecodeOptions,
    ) -> ScimResult<Option<Value>> {
        if json.is_null() {
            return Ok(None);
        }
        if attr.multi_valued {
            let items = match json {
                Json::Array(items) => items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| Self::element_from_json(attr, item, options))
                    .collect::<ScimResult<Vec<_>>>()?,
                other => vec![Self::element_from_json(attr, other, options)?],
            };
            return Ok((!items.is_empty()).then_some(Value::Multi(items)));
        }
        if json.is_array() {
            return Err(ScimError::InvalidValue(format!(
                "Attribute '{}' is single-valued but a list was given",
                attr.name
            )));
        }
        let value = Self::element_from_json(attr, json, options)?;
        Ok(match &value {
            Value::Complex(c) if c.is_empty() => None,
            _ => Some(value),
        })
    }

    /// Convert one JSON scalar or object to the element type of `attr`.
    pub fn element_from_json(
        attr: &SchemaAttribute,
        json: &Json,
        options: DecodeOptions,
    ) -> ScimResult<Value> {
        let mismatch = || {
            ScimError::InvalidValue(format!(
                "Invalid value for attribute '{}': expected {:?}, got {}",
                attr.name, attr.attr_type, json
            ))
        };
        let value = match (attr.attr_type, json) {
            (AttributeType::String, Json::String(s)) => Value::String(s.clone()),
            (AttributeType::Reference, Json::String(s)) => Value::Reference(s.clone()),
            (AttributeType::Boolean, Json::Bool(b)) => Value::Boolean(*b),
            // Some identity providers send booleans as strings ("True", "false")
            (AttributeType::Boolean, Json::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                _ => return Err(mismatch()),
            },
            (AttributeType::Integer, Json::Number(n)) => {
                Value::Integer(n.as_i64().ok_or_else(mismatch)?)
            }
            (AttributeType::Decimal, Json::Number(n)) => {
                Value::Decimal(n.as_f64().ok_or_else(mismatch)?)
            }
            (AttributeType::DateTime, Json::String(s)) => Value::DateTime(
                DateTime::parse_from_rfc3339(s)
                    .map_err(|_| mismatch())?
                    .with_timezone(&Utc),
            ),
            (AttributeType::Binary, Json::String(s)) => {
                Value::Binary(BASE64.decode(s).map_err(|_| mismatch())?)
            }
            (AttributeType::Complex, Json::Object(map)) => {
                Value::Complex(decode_complex(&attr.sub_attributes, map, options)?)
            }
            _ => return Err(mismatch()),
        };
        Ok(value)
    }

    /// Plain JSON rendering, without any context policy.
    pub fn to_json(&self) -> Json {
        match self {
            Value::String(s) | Value::Reference(s) => Json::String(s.clone()),
            Value::Boolean(b) => Json::Bool(*b),
            Value::Integer(i) => Json::from(*i),
            Value::Decimal(d) => serde_json::Number::from_f64(*d).map_or(Json::Null, Json::Number),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Binary(bytes) => Json::String(BASE64.encode(bytes)),
            Value::Complex(c) => {
                Json::Object(c.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
            Value::Multi(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<Complex> for Value {
    fn from(c: Complex) -> Self {
        Value::Complex(c)
    }
}

/// How unknown keys are treated while decoding a complex value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub ignore_unknown_attributes: bool,
}

/// Decode a JSON object against a list of attribute definitions.
///
/// Keys are matched case-insensitively per RFC 7643 Section 2.1 and stored
/// under the declared attribute name.
pub fn decode_complex(
    attributes: &[SchemaAttribute],
    object: &Map<String, Json>,
    options: DecodeOptions,
) -> ScimResult<Complex> {
    let mut complex = Complex::new();
    for (key, json) in object {
        let Some(attr) = find_attribute(attributes, key) else {
            if options.ignore_unknown_attributes {
                debug!(attribute = %key, "Ignoring unknown attribute");
                continue;
            }
            return Err(ScimError::InvalidSyntax(format!("Unknown attribute '{key}'")));
        };
        match Value::from_json(attr, json, options)? {
            Some(value) => {
                complex.insert(attr.name.clone(), value);
            }
            None => {
                complex.remove(&attr.name);
            }
        }
    }
    Ok(complex)
}
