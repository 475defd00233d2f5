//! Dynamically typed property values.
//!
//! # Responsibility
//! - Define the tagged variant carried by every property store.
//! - Parse command-line literals into values without reinterpreting
//!   bracketed payloads.
//!
//! # Invariants
//! - Values round-trip through JSON unchanged (int stays int, float stays
//!   float).
//! - Literal parsing never fails: anything that is not a JSON literal is a
//!   plain string.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A dynamically typed property value.
///
/// Variant order matters: serde tries untagged variants top to bottom, so
/// integers must come before floats to survive a round-trip intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Parses a command-language literal.
    ///
    /// JSON literals (numbers, booleans, quoted strings, `[...]` arrays,
    /// `{...}` maps) are taken as-is; everything else becomes a plain
    /// string. Bracketed payloads are therefore passed through opaquely.
    pub fn parse_literal(text: &str) -> PropertyValue {
        let trimmed = text.trim();
        if let Ok(value) = serde_json::from_str::<PropertyValue>(trimmed) {
            return value;
        }
        PropertyValue::String(trimmed.to_string())
    }

    /// Stable type label used in schema error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Int(value) => Some(*value != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(value) => Some(*value as i64),
            _ => None,
        }
    }

    /// Numeric accessor; integers widen to float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::Array(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, PropertyValue>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Converts to a JSON document value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Converts from a JSON document value.
    ///
    /// Returns `None` for values with no property representation (`null`),
    /// which callers treat as a per-key skip.
    pub fn from_json(value: &serde_json::Value) -> Option<PropertyValue> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Builds a float array value, the shape used for coordinates/bounds.
    pub fn float_array(values: &[f64]) -> PropertyValue {
        PropertyValue::Array(values.iter().map(|v| PropertyValue::Float(*v)).collect())
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            other => {
                let rendered = serde_json::to_string(other).map_err(|_| std::fmt::Error)?;
                f.write_str(&rendered)
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::PropertyValue;

    #[test]
    fn literal_parsing_covers_all_variants() {
        assert_eq!(PropertyValue::parse_literal("true"), PropertyValue::Bool(true));
        assert_eq!(PropertyValue::parse_literal("42"), PropertyValue::Int(42));
        assert_eq!(
            PropertyValue::parse_literal("0.5"),
            PropertyValue::Float(0.5)
        );
        assert_eq!(
            PropertyValue::parse_literal("\"quoted text\""),
            PropertyValue::String("quoted text".to_string())
        );
        assert_eq!(
            PropertyValue::parse_literal("red"),
            PropertyValue::String("red".to_string())
        );
        assert_eq!(
            PropertyValue::parse_literal("[1, 2, 3]"),
            PropertyValue::Array(vec![
                PropertyValue::Int(1),
                PropertyValue::Int(2),
                PropertyValue::Int(3)
            ])
        );
        assert!(matches!(
            PropertyValue::parse_literal("{\"r\": 255}"),
            PropertyValue::Map(_)
        ));
    }

    #[test]
    fn int_and_float_survive_json_round_trip() {
        let int = PropertyValue::Int(7);
        let float = PropertyValue::Float(7.5);

        let int_back = PropertyValue::from_json(&int.to_json()).expect("int round-trip");
        let float_back = PropertyValue::from_json(&float.to_json()).expect("float round-trip");

        assert_eq!(int_back, int);
        assert_eq!(float_back, float);
    }

    #[test]
    fn null_has_no_property_representation() {
        assert_eq!(PropertyValue::from_json(&serde_json::Value::Null), None);
    }

    #[test]
    fn display_renders_strings_bare_and_rest_as_json() {
        assert_eq!(PropertyValue::from("red").to_string(), "red");
        assert_eq!(PropertyValue::Int(3).to_string(), "3");
        assert_eq!(
            PropertyValue::float_array(&[1.0, 2.0]).to_string(),
            "[1.0,2.0]"
        );
    }
}
