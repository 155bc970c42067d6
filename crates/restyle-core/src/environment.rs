//! Host-provided environment sources.
//!
//! The runtime never talks to the OS directly. Appearance, persisted
//! preferences and viewport metrics come in through these traits and are
//! injected with [`RuntimeBuilder`](crate::RuntimeBuilder).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::Subscription;
use crate::error::StorageError;
use crate::topics::ColorScheme;

/// OS appearance query.
pub trait Appearance {
    /// The scheme the OS currently prefers, if it reports one.
    fn color_scheme(&self) -> Option<ColorScheme>;
}

impl<F: Fn() -> Option<ColorScheme>> Appearance for F {
    fn color_scheme(&self) -> Option<ColorScheme> {
        self()
    }
}

/// Appearance source for hosts without an OS theme.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAppearance;

impl Appearance for NoAppearance {
    fn color_scheme(&self) -> Option<ColorScheme> {
        None
    }
}

/// String key-value persistence surface.
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Storage for hosts without persistence. Every access fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStorage;

impl KeyValueStorage for NoStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("no storage configured".into()))
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("no storage configured".into()))
    }
}

/// In-process storage. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(Rc<RefCell<HashMap<String, String>>>);

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(self, key: &str, value: &str) -> Self {
        self.0.borrow_mut().insert(key.into(), value.into());
        self
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.0.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0.borrow_mut().insert(key.into(), value.into());
        Ok(())
    }
}

/// Logical window size in px.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

impl WindowSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

pub type ViewportListener = Rc<dyn Fn(&WindowSize)>;

/// Display metrics provider.
pub trait Viewport {
    /// Size of a named surface; the runtime only asks for `"window"`.
    fn get(&self, surface: &str) -> Option<WindowSize>;

    /// Registers a listener for size changes of the window surface.
    fn add_change_listener(&self, listener: ViewportListener) -> Subscription;
}
