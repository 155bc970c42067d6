//! Reactive record store.
//!
//! A [`RecordStore`] holds a string-keyed record and notifies listeners with
//! the `(new, old)` snapshot pair after every write. It is the base for the
//! topic store, the style store and the style-set cache.
//!
//! - Writes are shallow merges: keys absent from the partial are preserved.
//! - Listeners run synchronously, in registration order, once per write.
//! - A write issued while the same store is notifying is queued and applied
//!   after the current pass, so every listener of a pass sees the same pair.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::{SlotMap, new_key_type};

use crate::Subscription;

pub type Record<V> = BTreeMap<String, V>;

new_key_type! {
    /// Identifies one registered listener.
    pub struct ListenerKey;
}

/// Change detection for record entries.
pub trait StoreValue: Clone + 'static {
    /// `true` when `other` should be treated as the same entry (no change).
    fn same_as(&self, other: &Self) -> bool;
}

impl<T: StoreValue> StoreValue for Option<T> {
    fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_as(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: 'static> StoreValue for Rc<[T]> {
    fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

/// Compares one key across two snapshots.
pub fn entry_changed<V: StoreValue>(new: &Record<V>, old: &Record<V>, key: &str) -> bool {
    match (new.get(key), old.get(key)) {
        (Some(a), Some(b)) => !a.same_as(b),
        (None, None) => false,
        _ => true,
    }
}

type Listener<V> = Rc<dyn Fn(&Record<V>, &Record<V>)>;
type Updater<V> = Box<dyn FnOnce(&Record<V>) -> Record<V>>;

enum Patch<V> {
    Merge(Record<V>),
    Update(Updater<V>),
    Replace(Record<V>),
}

impl<V: Clone> Patch<V> {
    fn apply(self, current: &Record<V>) -> Record<V> {
        match self {
            Patch::Merge(partial) => merged(current, partial),
            Patch::Update(f) => {
                let partial = f(current);
                merged(current, partial)
            }
            Patch::Replace(value) => value,
        }
    }
}

fn merged<V: Clone>(current: &Record<V>, partial: Record<V>) -> Record<V> {
    let mut next = current.clone();
    next.extend(partial);
    next
}

struct Inner<V> {
    value: Rc<Record<V>>,
    listeners: SlotMap<ListenerKey, Listener<V>>,
    order: Vec<ListenerKey>,
    pending: VecDeque<Patch<V>>,
    notifying: bool,
}

pub struct RecordStore<V>(Rc<RefCell<Inner<V>>>);

impl<V> Clone for RecordStore<V> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<V: StoreValue> Default for RecordStore<V> {
    fn default() -> Self {
        Self::new(Record::new())
    }
}

impl<V: StoreValue> RecordStore<V> {
    pub fn new(value: Record<V>) -> Self {
        Self(Rc::new(RefCell::new(Inner {
            value: Rc::new(value),
            listeners: SlotMap::with_key(),
            order: Vec::new(),
            pending: VecDeque::new(),
            notifying: false,
        })))
    }

    /// Current snapshot. Cheap: the record is shared, not copied.
    pub fn get(&self) -> Rc<Record<V>> {
        self.0.borrow().value.clone()
    }

    pub fn entry(&self, key: &str) -> Option<V> {
        self.0.borrow().value.get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().value.contains_key(key)
    }

    /// Shallow-merges `partial` into the record and notifies once.
    pub fn set(&self, partial: Record<V>) {
        self.dispatch(Patch::Merge(partial));
    }

    /// Merges the partial returned by `f`, evaluated against the value current
    /// at the time the write is applied.
    pub fn update(&self, f: impl FnOnce(&Record<V>) -> Record<V> + 'static) {
        self.dispatch(Patch::Update(Box::new(f)));
    }

    /// Replaces the whole record. Used when resetting.
    pub fn replace(&self, value: Record<V>) {
        self.dispatch(Patch::Replace(value));
    }

    pub fn subscribe(&self, f: impl Fn(&Record<V>, &Record<V>) + 'static) -> Subscription {
        let key = {
            let mut inner = self.0.borrow_mut();
            let key = inner.listeners.insert(Rc::new(f));
            inner.order.push(key);
            key
        };
        let weak: Weak<RefCell<Inner<V>>> = Rc::downgrade(&self.0);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.borrow_mut();
                inner.listeners.remove(key);
                inner.order.retain(|k| *k != key);
            }
        })
    }

    /// Subscribes to a single entry: `f` only runs when that entry changes.
    pub fn subscribe_key(
        &self,
        key: impl Into<String>,
        f: impl Fn(Option<&V>) + 'static,
    ) -> Subscription {
        let key = key.into();
        self.subscribe(move |new, old| {
            if entry_changed(new, old, &key) {
                f(new.get(&key));
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.0.borrow().listeners.len()
    }

    fn dispatch(&self, patch: Patch<V>) {
        {
            let mut inner = self.0.borrow_mut();
            inner.pending.push_back(patch);
            if inner.notifying {
                return;
            }
            inner.notifying = true;
        }

        // Clears the notifying flag even if a listener unwinds.
        struct Guard<'a, V>(&'a RefCell<Inner<V>>);
        impl<V> Drop for Guard<'_, V> {
            fn drop(&mut self) {
                if let Ok(mut inner) = self.0.try_borrow_mut() {
                    inner.notifying = false;
                    inner.pending.clear();
                }
            }
        }
        let _guard = Guard(&*self.0);

        loop {
            let (new, old, listeners) = {
                let mut inner = self.0.borrow_mut();
                let Some(patch) = inner.pending.pop_front() else {
                    break;
                };
                let old = inner.value.clone();
                let new = Rc::new(patch.apply(&old));
                inner.value = new.clone();
                let listeners: Vec<(ListenerKey, Listener<V>)> = inner
                    .order
                    .iter()
                    .filter_map(|k| inner.listeners.get(*k).map(|l| (*k, l.clone())))
                    .collect();
                (new, old, listeners)
            };

            for (key, listener) in listeners {
                // Skip listeners torn down earlier in this pass.
                if !self.0.borrow().listeners.contains_key(key) {
                    continue;
                }
                listener(&*new, &*old);
            }
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for RecordStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("RecordStore")
            .field("value", &inner.value)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}
