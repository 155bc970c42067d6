//! Per-instance condition filtering.
//!
//! Conditions gate a whole atom for one component instance and never touch
//! the topic store. Built-ins read the `nthChild` state entry:
//!
//! - `not-first-child`: `nthChild > 0`
//! - `odd` / `even`: parity of `nthChild`
//!
//! Any other condition name is looked up in the state as a flag.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use smallvec::SmallVec;

use crate::atom::Atom;

/// State entry holding the instance's child index.
pub const NTH_CHILD: &str = "nthChild";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StateValue {
    Bool(bool),
    Number(f64),
}

impl StateValue {
    fn truthy(self) -> bool {
        match self {
            StateValue::Bool(b) => b,
            StateValue::Number(n) => n != 0.0 && !n.is_nan(),
        }
    }
}

impl From<bool> for StateValue {
    fn from(b: bool) -> Self {
        StateValue::Bool(b)
    }
}

impl From<i32> for StateValue {
    fn from(n: i32) -> Self {
        StateValue::Number(f64::from(n))
    }
}

impl From<usize> for StateValue {
    fn from(n: usize) -> Self {
        StateValue::Number(n as f64)
    }
}

impl From<f64> for StateValue {
    fn from(n: f64) -> Self {
        StateValue::Number(n)
    }
}

/// Transient per-instance component state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComponentState(BTreeMap<String, StateValue>);

impl ComponentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<StateValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_nth_child(self, index: usize) -> Self {
        self.with(NTH_CHILD, index)
    }

    pub fn set(&mut self, key: &str, value: impl Into<StateValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<StateValue> {
        self.0.get(key).copied()
    }

    fn nth_child(&self) -> Option<f64> {
        match self.get(NTH_CHILD) {
            Some(StateValue::Number(n)) => Some(n),
            _ => None,
        }
    }

    /// Whether a single condition holds for this instance.
    pub fn satisfies(&self, condition: &str) -> bool {
        match condition {
            "not-first-child" => self.nth_child().is_some_and(|n| n > 0.0),
            "odd" => self.nth_child().is_some_and(|n| n.rem_euclid(2.0) == 1.0),
            "even" => self.nth_child().is_some_and(|n| n.rem_euclid(2.0) == 0.0),
            flag => self.get(flag).is_some_and(StateValue::truthy),
        }
    }
}

impl<K: Into<String>, V: Into<StateValue>> FromIterator<(K, V)> for ComponentState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The condition-filtered view of a class string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActiveKey {
    /// Surviving tokens joined by single spaces.
    pub key: String,
    pub tokens: SmallVec<[String; 8]>,
    /// Every condition name met while filtering, passing or not.
    pub conditions: BTreeSet<String>,
}

/// Splits `class_name` on whitespace and keeps the tokens whose atoms are
/// registered and whose conditions all hold for `state`.
pub fn resolve_active(
    class_name: &str,
    state: &ComponentState,
    lookup: impl Fn(&str) -> Option<Rc<Atom>>,
) -> ActiveKey {
    let mut active = ActiveKey::default();

    for token in class_name.split_whitespace() {
        let Some(atom) = lookup(token) else {
            continue;
        };

        let mut passing = true;
        for condition in &atom.conditions {
            active.conditions.insert(condition.clone());
            passing = passing && state.satisfies(condition);
        }

        if passing {
            active.tokens.push(token.to_string());
        }
    }

    active.key = active.tokens.join(" ");
    active
}
