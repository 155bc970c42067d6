//! Style-set flattening.
//!
//! A style set is the concatenation, in token order, of the style lists of
//! every atom in a composite key. Absent atom entries contribute nothing.

use std::rc::Rc;

use crate::store::{Record, entry_changed};
use crate::value::StyleList;

/// Styles per atom name, as held by the style store.
pub type AtomStyles = Record<Option<StyleList>>;

pub fn flatten(tokens: &[String], styles: &AtomStyles) -> StyleList {
    let declarations: Vec<_> = tokens
        .iter()
        .filter_map(|token| styles.get(token).and_then(Option::as_ref))
        .flat_map(|list| list.iter().cloned())
        .collect();
    Rc::from(declarations)
}

/// Whether any constituent's entry differs between the two snapshots.
pub fn constituents_changed(tokens: &[String], new: &AtomStyles, old: &AtomStyles) -> bool {
    tokens.iter().any(|token| entry_changed(new, old, token))
}

pub fn join_key<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}
