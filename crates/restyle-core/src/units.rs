use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::StyleError;
use crate::topics::TopicView;
use crate::value::StyleValue;

/// Unit converters understood by the evaluator.
///
/// Units are applied in declared order, each one taking the previous
/// converter's output as input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Unit {
    Px,
    Rem,
    Em,
    Vw,
    Vh,
    Vmin,
    Vmax,
    Percent,
    Deg,
    Rad,
}

/// Inputs a unit conversion may read.
#[derive(Clone, Copy, Debug)]
pub struct UnitEnv<'a> {
    pub topics: TopicView<'a>,
    /// Root font size in px.
    pub rem: f64,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Rem => "rem",
            Unit::Em => "em",
            Unit::Vw => "vw",
            Unit::Vh => "vh",
            Unit::Vmin => "vmin",
            Unit::Vmax => "vmax",
            Unit::Percent => "%",
            Unit::Deg => "deg",
            Unit::Rad => "rad",
        }
    }

    /// Converts `value`. Non-numeric input is returned unchanged.
    pub fn apply(self, value: StyleValue, env: &UnitEnv<'_>) -> StyleValue {
        let Some(n) = value.as_number() else {
            log::trace!("unit `{}` skipped non-numeric value {value}", self.as_str());
            return value;
        };
        let width = env.topics.width();
        let height = env.topics.height();
        match self {
            Unit::Px => StyleValue::Number(n),
            Unit::Rem | Unit::Em => StyleValue::Number(n * env.rem),
            Unit::Vw => StyleValue::Number(width * n / 100.0),
            Unit::Vh => StyleValue::Number(height * n / 100.0),
            Unit::Vmin => StyleValue::Number(width.min(height) * n / 100.0),
            Unit::Vmax => StyleValue::Number(width.max(height) * n / 100.0),
            Unit::Percent | Unit::Deg | Unit::Rad => {
                StyleValue::String(format!("{n}{}", self.as_str()))
            }
        }
    }
}

impl FromStr for Unit {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "px" => Unit::Px,
            "rem" => Unit::Rem,
            "em" => Unit::Em,
            "vw" => Unit::Vw,
            "vh" => Unit::Vh,
            "vmin" => Unit::Vmin,
            "vmax" => Unit::Vmax,
            "%" => Unit::Percent,
            "deg" => Unit::Deg,
            "rad" => Unit::Rad,
            other => return Err(StyleError::UnknownUnit(other.to_string())),
        })
    }
}

impl TryFrom<String> for Unit {
    type Error = StyleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Unit> for &'static str {
    fn from(unit: Unit) -> Self {
        unit.as_str()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
