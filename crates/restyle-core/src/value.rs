use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::StyleError;
use crate::units::Unit;

/// A resolved style property value, as handed to the host renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<StyleValue>),
    Object(BTreeMap<String, StyleValue>),
}

impl StyleValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            StyleValue::Number(n) => Some(*n),
            StyleValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StyleValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Null => f.write_str("null"),
            StyleValue::Bool(b) => write!(f, "{b}"),
            StyleValue::Number(n) => write!(f, "{n}"),
            StyleValue::String(s) => f.write_str(s),
            other => match serde_json::to_string(other) {
                Ok(s) => f.write_str(&s),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<f64> for StyleValue {
    fn from(n: f64) -> Self {
        StyleValue::Number(n)
    }
}

impl From<i32> for StyleValue {
    fn from(n: i32) -> Self {
        StyleValue::Number(f64::from(n))
    }
}

impl From<bool> for StyleValue {
    fn from(b: bool) -> Self {
        StyleValue::Bool(b)
    }
}

impl From<&str> for StyleValue {
    fn from(s: &str) -> Self {
        StyleValue::String(s.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(s: String) -> Self {
        StyleValue::String(s)
    }
}

/// One declaration property as authored: a literal, or a value that still
/// needs unit conversion against the current environment.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "StyleValue")]
pub enum PropertyValue {
    Literal(StyleValue),
    Units { value: StyleValue, units: Vec<Unit> },
}

impl PropertyValue {
    pub fn with_units(value: impl Into<StyleValue>, units: impl IntoIterator<Item = Unit>) -> Self {
        PropertyValue::Units {
            value: value.into(),
            units: units.into_iter().collect(),
        }
    }
}

macro_rules! literal_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    PropertyValue::Literal(value.into())
                }
            }
        )*
    };
}

literal_from!(f64, i32, bool, &str, String);

impl TryFrom<StyleValue> for PropertyValue {
    type Error = StyleError;

    // `{ "value": .., "units": [..] }` is the compiler's unit pair; any other
    // object is a literal (shadow offsets, transforms).
    fn try_from(value: StyleValue) -> Result<Self, Self::Error> {
        let mut map = match value {
            StyleValue::Object(map) => map,
            other => return Ok(PropertyValue::Literal(other)),
        };
        let is_unit_pair = map.len() == 2
            && map.contains_key("value")
            && matches!(map.get("units"), Some(StyleValue::Array(_)));
        if !is_unit_pair {
            return Ok(PropertyValue::Literal(StyleValue::Object(map)));
        }

        let Some(StyleValue::Array(raw_units)) = map.remove("units") else {
            return Ok(PropertyValue::Literal(StyleValue::Object(map)));
        };
        let value = map.remove("value").unwrap_or(StyleValue::Null);
        let units = raw_units
            .iter()
            .map(|u| match u {
                StyleValue::String(name) => name.parse::<Unit>(),
                other => Err(StyleError::UnknownUnit(other.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PropertyValue::Units { value, units })
    }
}

/// A style declaration as authored by the compiler (one variant layer).
pub type RawDeclaration = BTreeMap<String, PropertyValue>;

/// A resolved declaration: property name to literal value.
pub type StyleDeclaration = BTreeMap<String, StyleValue>;

/// An immutable, shared sequence of resolved declarations.
pub type StyleList = Rc<[StyleDeclaration]>;

pub fn empty_style_list() -> StyleList {
    Rc::from(Vec::new())
}
