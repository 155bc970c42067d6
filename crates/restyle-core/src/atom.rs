//! Atoms: named style rule bundles produced by the style compiler.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use smallvec::SmallVec;

use crate::StyleError;
use crate::value::{PropertyValue, RawDeclaration};

/// Opaque boolean flags consumers use for semantic grouping.
pub type Meta = BTreeMap<String, bool>;

/// Gate attached to one style layer.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub enum AtRule {
    /// Selector marker (`group-hover`, ...). Never passes for the atom's own
    /// layer; only gates the child cascade.
    Selector(Option<String>),
    /// Passes when the parameter equals the current `colorScheme` topic.
    ColorScheme(String),
    /// Anything else (`media`, ...) is handed to the media matcher.
    Other { rule: String, params: Option<String> },
}

impl AtRule {
    pub fn new(rule: &str, params: Option<&str>) -> Result<Self, StyleError> {
        let params = params.map(str::to_string);
        match rule {
            "" => Err(StyleError::InvalidAtRule("empty rule name".into())),
            "selector" => Ok(AtRule::Selector(params)),
            "colorScheme" => params.map(AtRule::ColorScheme).ok_or_else(|| {
                StyleError::InvalidAtRule("colorScheme rule without a scheme".into())
            }),
            _ => Ok(AtRule::Other {
                rule: rule.to_string(),
                params,
            }),
        }
    }

    pub fn media(query: &str) -> Self {
        AtRule::Other {
            rule: "media".into(),
            params: Some(query.into()),
        }
    }
}

impl TryFrom<Vec<String>> for AtRule {
    type Error = StyleError;

    fn try_from(parts: Vec<String>) -> Result<Self, Self::Error> {
        match parts.as_slice() {
            [rule] => AtRule::new(rule, None),
            [rule, params] => AtRule::new(rule, Some(params.as_str())),
            _ => Err(StyleError::InvalidAtRule(format!(
                "expected [rule, params?], got {} parts",
                parts.len()
            ))),
        }
    }
}

/// A named, immutable-once-registered style rule bundle.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Atom {
    /// One declaration per variant layer, in cascade order.
    pub styles: Vec<RawDeclaration>,
    /// Layer index to the at-rules gating that layer (AND semantics).
    pub at_rules: BTreeMap<usize, Vec<AtRule>>,
    /// Conditions gating the whole atom for a component instance.
    pub conditions: Vec<String>,
    pub custom_properties: BTreeSet<String>,
    pub topics: BTreeSet<String>,
    pub child_classes: Option<Vec<String>>,
    pub meta: Option<Meta>,
}

impl Atom {
    pub fn new(styles: impl IntoIterator<Item = RawDeclaration>) -> Self {
        Self {
            styles: styles.into_iter().collect(),
            ..Self::default()
        }
    }

    /// An atom with no styles carrying only metadata (`group`, `parent`).
    pub fn structural(flag: &str) -> Self {
        Self {
            meta: Some(Meta::from([(flag.to_string(), true)])),
            ..Self::default()
        }
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, StyleError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn with_at_rules(mut self, layer: usize, rules: impl IntoIterator<Item = AtRule>) -> Self {
        self.at_rules.insert(layer, rules.into_iter().collect());
        self
    }

    pub fn with_topics<S: Into<String>>(mut self, topics: impl IntoIterator<Item = S>) -> Self {
        self.topics.extend(topics.into_iter().map(Into::into));
        self
    }

    pub fn with_custom_properties<S: Into<String>>(
        mut self,
        keys: impl IntoIterator<Item = S>,
    ) -> Self {
        self.custom_properties
            .extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_children<S: Into<String>>(mut self, children: impl IntoIterator<Item = S>) -> Self {
        self.child_classes = Some(children.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_conditions<S: Into<String>>(
        mut self,
        conditions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.conditions = conditions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_meta(mut self, flag: &str, value: bool) -> Self {
        self.meta
            .get_or_insert_with(Meta::new)
            .insert(flag.to_string(), value);
        self
    }

    /// Gates for layer `index`; empty when the layer is unconditional.
    pub fn layer_rules(&self, index: usize) -> &[AtRule] {
        self.at_rules.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Topic keys whose change re-evaluates this atom.
    pub fn dependencies(&self) -> AtomDependencies {
        self.topics
            .iter()
            .chain(self.custom_properties.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn children(&self) -> &[String] {
        self.child_classes.as_deref().unwrap_or(&[])
    }
}

pub type AtomDependencies = SmallVec<[String; 4]>;

/// Builds one raw declaration from `(property, value)` pairs.
pub fn declaration<K, V>(props: impl IntoIterator<Item = (K, V)>) -> RawDeclaration
where
    K: Into<String>,
    V: Into<PropertyValue>,
{
    props
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
