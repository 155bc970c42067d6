//! Topic keys and values.
//!
//! Topics are the environment facts atoms may depend on. The topic store
//! always holds [`PLATFORM`], [`COLOR_SCHEME`], [`COLOR_SCHEME_SYSTEM`],
//! [`WIDTH`], [`HEIGHT`] and [`ORIENTATION`]; custom properties (`--name`)
//! and arbitrary host topics live next to them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::store::{Record, StoreValue};

pub const PLATFORM: &str = "platform";
pub const COLOR_SCHEME: &str = "colorScheme";
pub const COLOR_SCHEME_SYSTEM: &str = "colorSchemeSystem";
pub const WIDTH: &str = "width";
pub const HEIGHT: &str = "height";
pub const ORIENTATION: &str = "orientation";

/// Prefix every custom property key carries.
pub const CUSTOM_PROPERTY_PREFIX: &str = "--";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicValue {
    Number(f64),
    Str(String),
}

impl TopicValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TopicValue::Number(n) => Some(*n),
            TopicValue::Str(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TopicValue::Str(s) => Some(s),
            TopicValue::Number(_) => None,
        }
    }
}

impl StoreValue for TopicValue {
    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

impl fmt::Display for TopicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicValue::Number(n) => write!(f, "{n}"),
            TopicValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<f64> for TopicValue {
    fn from(n: f64) -> Self {
        TopicValue::Number(n)
    }
}

impl From<i32> for TopicValue {
    fn from(n: i32) -> Self {
        TopicValue::Number(f64::from(n))
    }
}

impl From<&str> for TopicValue {
    fn from(s: &str) -> Self {
        TopicValue::Str(s.to_string())
    }
}

impl From<String> for TopicValue {
    fn from(s: String) -> Self {
        TopicValue::Str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl ColorScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorScheme::Light => "light",
            ColorScheme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ColorScheme::Light => ColorScheme::Dark,
            ColorScheme::Dark => ColorScheme::Light,
        }
    }
}

impl FromStr for ColorScheme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(ColorScheme::Light),
            "dark" => Ok(ColorScheme::Dark),
            _ => Err(()),
        }
    }
}

/// What the user asked for: a pinned scheme, or follow the OS.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSchemeSetting {
    Light,
    Dark,
    #[default]
    System,
}

impl ColorSchemeSetting {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorSchemeSetting::Light => "light",
            ColorSchemeSetting::Dark => "dark",
            ColorSchemeSetting::System => "system",
        }
    }
}

impl From<ColorScheme> for ColorSchemeSetting {
    fn from(scheme: ColorScheme) -> Self {
        match scheme {
            ColorScheme::Light => ColorSchemeSetting::Light,
            ColorScheme::Dark => ColorSchemeSetting::Dark,
        }
    }
}

impl FromStr for ColorSchemeSetting {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(ColorSchemeSetting::System),
            other => other.parse::<ColorScheme>().map(Into::into),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Landscape only when strictly wider than tall.
    pub fn from_size(width: f64, height: f64) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl FromStr for Orientation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            _ => Err(()),
        }
    }
}

pub fn is_custom_property(key: &str) -> bool {
    key.starts_with(CUSTOM_PROPERTY_PREFIX) && key.len() > CUSTOM_PROPERTY_PREFIX.len()
}

/// Typed reads over a topic snapshot.
#[derive(Clone, Copy, Debug)]
pub struct TopicView<'a>(pub &'a Record<TopicValue>);

impl<'a> TopicView<'a> {
    pub fn get(&self, key: &str) -> Option<&'a TopicValue> {
        self.0.get(key)
    }

    pub fn platform(&self) -> &'a str {
        self.0
            .get(PLATFORM)
            .and_then(TopicValue::as_str)
            .unwrap_or_default()
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.0
            .get(COLOR_SCHEME)
            .and_then(TopicValue::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn color_scheme_setting(&self) -> ColorSchemeSetting {
        self.0
            .get(COLOR_SCHEME_SYSTEM)
            .and_then(TopicValue::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn width(&self) -> f64 {
        self.number(WIDTH)
    }

    pub fn height(&self) -> f64 {
        self.number(HEIGHT)
    }

    pub fn orientation(&self) -> Orientation {
        self.0
            .get(ORIENTATION)
            .and_then(TopicValue::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| Orientation::from_size(self.width(), self.height()))
    }

    fn number(&self, key: &str) -> f64 {
        self.0
            .get(key)
            .and_then(TopicValue::as_number)
            .unwrap_or(0.0)
    }
}
