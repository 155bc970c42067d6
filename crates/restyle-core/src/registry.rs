use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::Subscription;
use crate::atom::{Atom, Meta};

struct Entry {
    atom: Rc<Atom>,
    subscription: Option<Subscription>,
}

/// Non-reactive table of registered atoms.
#[derive(Default)]
pub struct AtomRegistry {
    atoms: HashMap<String, Entry>,
}

impl AtomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Rc<Atom>> {
        self.atoms.get(name).map(|e| e.atom.clone())
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.atoms.keys().map(String::as_str)
    }

    /// Detaches the live topic subscription of `name` so the caller can tear
    /// it down outside of any borrow.
    pub fn take_subscription(&mut self, name: &str) -> Option<Subscription> {
        self.atoms
            .get_mut(name)
            .and_then(|e| e.subscription.take())
    }

    /// Registers or replaces `name`. Returns the replaced entry's subscription
    /// if it still had one.
    pub fn insert(
        &mut self,
        name: String,
        atom: Rc<Atom>,
        subscription: Option<Subscription>,
    ) -> Option<Subscription> {
        self.atoms
            .insert(name, Entry { atom, subscription })
            .and_then(|old| old.subscription)
    }

    /// Child classes and merged metadata of the atoms in `tokens`, read from
    /// the atoms registered now. Later tokens win on conflicting flags.
    pub fn describe(&self, tokens: &[String]) -> (Option<Vec<String>>, Option<Meta>) {
        let mut children = Vec::new();
        let mut meta = Meta::new();
        for entry in tokens.iter().filter_map(|token| self.atoms.get(token)) {
            children.extend(entry.atom.children().iter().cloned());
            if let Some(m) = &entry.atom.meta {
                meta.extend(m.iter().map(|(k, v)| (k.clone(), *v)));
            }
        }
        (
            (!children.is_empty()).then_some(children),
            (!meta.is_empty()).then_some(meta),
        )
    }

    /// Looks for a child-class cycle through any of `incoming`, resolving
    /// children against `incoming` first and the registered atoms second.
    /// Returns the offending path, first name repeated at the end.
    pub fn find_cycle(&self, incoming: &[(String, Rc<Atom>)]) -> Option<Vec<String>> {
        let graph = Graph {
            pending: incoming
                .iter()
                .map(|(name, atom)| (name.as_str(), atom.as_ref()))
                .collect(),
            registered: &self.atoms,
        };

        let mut done = HashSet::new();
        for (name, _) in incoming {
            let mut path = Vec::new();
            if let Some(cycle) = graph.visit(name, &mut path, &mut done) {
                return Some(cycle);
            }
        }
        None
    }

    /// Empties every table and hands back the live subscriptions.
    pub fn clear(&mut self) -> Vec<Subscription> {
        self.atoms
            .drain()
            .filter_map(|(_, e)| e.subscription)
            .collect()
    }
}

struct Graph<'a> {
    pending: HashMap<&'a str, &'a Atom>,
    registered: &'a HashMap<String, Entry>,
}

impl<'a> Graph<'a> {
    fn get(&self, name: &str) -> Option<&'a Atom> {
        self.pending
            .get(name)
            .copied()
            .or_else(|| self.registered.get(name).map(|e| e.atom.as_ref()))
    }

    fn visit(
        &self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Option<Vec<String>> {
        if let Some(start) = path.iter().position(|n| *n == name) {
            let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
            cycle.push(name.to_string());
            return Some(cycle);
        }
        if done.contains(name) {
            return None;
        }
        let atom = self.get(name)?;
        path.push(name);
        for child in atom.children() {
            if let Some(cycle) = self.visit(child, path, done) {
                return Some(cycle);
            }
        }
        path.pop();
        done.insert(name);
        None
    }
}

impl fmt::Debug for AtomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomRegistry")
            .field("atoms", &self.atoms.len())
            .finish()
    }
}
