//! Atom evaluation.
//!
//! [`evaluate`] turns one atom into its currently applicable declarations:
//!
//! 1. each layer is copied and its unit pairs resolved (`var(--x)` literals
//!    are substituted from the topic snapshot first);
//! 2. a layer without at-rules is always included;
//! 3. otherwise every at-rule must pass. `selector` never passes,
//!    `colorScheme` compares with the current scheme, anything else goes to
//!    the media matcher;
//! 4. a passing gated layer also evaluates the atom's children and merges
//!    their entries in; a failing one marks every child as absent.
//!
//! The result maps atom names to `Some(styles)` or `None` (explicitly absent)
//! and is merged into the style store as-is.

use std::rc::Rc;

use crate::atom::{AtRule, Atom};
use crate::media::{MediaEnv, MediaMatcher};
use crate::registry::AtomRegistry;
use crate::store::Record;
use crate::topics::{TopicValue, TopicView};
use crate::units::UnitEnv;
use crate::value::{PropertyValue, RawDeclaration, StyleDeclaration, StyleList, StyleValue};

/// Everything one evaluation pass reads.
pub struct EvalContext<'a> {
    pub registry: &'a AtomRegistry,
    pub topics: &'a Record<TopicValue>,
    pub matcher: &'a dyn MediaMatcher,
    /// Root font size in px.
    pub rem: f64,
}

pub type Evaluated = Record<Option<StyleList>>;

pub fn evaluate(name: &str, atom: &Atom, cx: &EvalContext<'_>) -> Evaluated {
    let mut out = Evaluated::new();
    let mut stack = Vec::new();
    evaluate_into(name, atom, cx, &mut stack, &mut out);
    out
}

fn evaluate_into(
    name: &str,
    atom: &Atom,
    cx: &EvalContext<'_>,
    stack: &mut Vec<String>,
    out: &mut Evaluated,
) {
    if stack.iter().any(|n| n == name) {
        // Registration rejects cycles; this only trips on hand-built registries.
        log::warn!("child class cycle through `{name}`; stopping cascade");
        return;
    }
    stack.push(name.to_string());

    let topics = TopicView(cx.topics);
    let units = UnitEnv {
        topics,
        rem: cx.rem,
    };
    let media = MediaEnv {
        platform: topics.platform(),
        width: topics.width(),
        height: topics.height(),
        orientation: topics.orientation(),
    };

    let mut resolved = Vec::with_capacity(atom.styles.len());
    for (index, layer) in atom.styles.iter().enumerate() {
        let declaration = resolve_layer(layer, &units);

        let rules = atom.layer_rules(index);
        if rules.is_empty() {
            resolved.push(declaration);
            continue;
        }

        let passes = rules.iter().all(|rule| rule_passes(rule, &topics, &media, cx));
        if passes {
            resolved.push(declaration);
            for child in atom.children() {
                match cx.registry.get(child) {
                    Some(child_atom) => evaluate_into(child, &child_atom, cx, stack, out),
                    None => {
                        out.insert(child.clone(), None);
                    }
                }
            }
        } else {
            for child in atom.children() {
                out.insert(child.clone(), None);
            }
        }
    }

    out.insert(name.to_string(), Some(Rc::from(resolved)));
    stack.pop();
}

fn rule_passes(
    rule: &AtRule,
    topics: &TopicView<'_>,
    media: &MediaEnv<'_>,
    cx: &EvalContext<'_>,
) -> bool {
    match rule {
        AtRule::Selector(_) => false,
        AtRule::ColorScheme(scheme) => topics.color_scheme().as_str() == scheme.as_str(),
        AtRule::Other { rule, params } => cx.matcher.matches(rule, params.as_deref(), media),
    }
}

fn resolve_layer(
    layer: &RawDeclaration,
    units: &UnitEnv<'_>,
) -> StyleDeclaration {
    layer
        .iter()
        .map(|(property, value)| {
            let resolved = match value {
                PropertyValue::Literal(literal) => substitute_var(literal, units.topics),
                PropertyValue::Units { value, units: list } => list
                    .iter()
                    .fold(substitute_var(value, units.topics), |acc, unit| {
                        unit.apply(acc, units)
                    }),
            };
            (property.clone(), resolved)
        })
        .collect()
}

/// Replaces a `var(--name)` / `var(--name, fallback)` literal with the topic
/// value. Unset properties without a fallback resolve to `null`.
fn substitute_var(value: &StyleValue, topics: TopicView<'_>) -> StyleValue {
    let Some(inner) = value
        .as_str()
        .map(str::trim)
        .and_then(|s| s.strip_prefix("var("))
        .and_then(|s| s.strip_suffix(')'))
    else {
        return value.clone();
    };
    let (key, fallback) = match inner.split_once(',') {
        Some((key, fallback)) => (key.trim(), Some(fallback.trim())),
        None => (inner.trim(), None),
    };
    match (topics.get(key), fallback) {
        (Some(TopicValue::Number(n)), _) => StyleValue::Number(*n),
        (Some(TopicValue::Str(s)), _) => StyleValue::String(s.clone()),
        (None, Some(fallback)) => match fallback.parse::<f64>() {
            Ok(n) => StyleValue::Number(n),
            Err(_) => StyleValue::String(fallback.to_string()),
        },
        (None, None) => StyleValue::Null,
    }
}
