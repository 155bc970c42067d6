//! The style runtime: one explicit context object owning the topic store,
//! the style store, the style-set cache and the atom registry.
//!
//! Propagation is synchronous and depth-first. A topic write re-evaluates
//! every dependent atom, which updates the style store, which re-flattens
//! every warm style set containing a changed atom, all before the setter
//! returns.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Serialize;

use crate::Subscription;
use crate::atom::{Atom, Meta};
use crate::cache::{self, AtomStyles};
use crate::conditions::{ComponentState, resolve_active};
use crate::config::{Output, RuntimeConfig, select_output};
use crate::effects::effect;
use crate::environment::{
    Appearance, KeyValueStorage, NoAppearance, NoStorage, Viewport, WindowSize,
};
use crate::error::StyleError;
use crate::evaluate::{EvalContext, Evaluated, evaluate};
use crate::media::{DefaultMediaMatcher, MediaMatcher};
use crate::registry::AtomRegistry;
use crate::store::{Record, RecordStore, entry_changed};
use crate::topics::{
    COLOR_SCHEME, COLOR_SCHEME_SYSTEM, ColorScheme, ColorSchemeSetting, HEIGHT, ORIENTATION,
    Orientation, PLATFORM, TopicValue, TopicView, WIDTH, is_custom_property,
};
use crate::value::{StyleList, empty_style_list};

/// Atoms every runtime carries: no styles, only metadata.
pub const STRUCTURAL_ATOMS: [(&str, &str); 3] = [
    ("group", "group"),
    ("group-isolate", "groupIsolate"),
    ("parent", "parent"),
];

/// Host hook handed compiled CSS at runtime. Stored, never called by the runtime.
pub type CompileHook = Rc<dyn Fn(&str, &StyleRuntime)>;

/// What a component receives for one class string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncStyle {
    pub styles: StyleList,
    pub child_classes: Option<Vec<String>>,
    pub meta: Option<Meta>,
    pub conditions: BTreeSet<String>,
    /// Composite key the styles were read from.
    pub key: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStats {
    pub atoms: usize,
    pub topic_listeners: usize,
    pub style_listeners: usize,
    pub style_set_listeners: usize,
    pub warm_keys: usize,
}

struct ViewportBinding {
    viewport: Rc<dyn Viewport>,
    subscription: Subscription,
}

struct Shared {
    config: RefCell<RuntimeConfig>,
    topics: RecordStore<TopicValue>,
    styles: RecordStore<Option<StyleList>>,
    style_sets: RecordStore<StyleList>,
    registry: RefCell<AtomRegistry>,
    warm: RefCell<HashMap<String, Subscription>>,
    preprocessed: Cell<bool>,
    matcher: Box<dyn MediaMatcher>,
    appearance: Box<dyn Appearance>,
    storage: Box<dyn KeyValueStorage>,
    viewport: RefCell<Option<ViewportBinding>>,
    compile_hook: RefCell<Option<CompileHook>>,
}

impl Shared {
    fn evaluate_atom(&self, name: &str, atom: &Atom, topics: &Record<TopicValue>) -> Evaluated {
        let registry = self.registry.borrow();
        let rem = self.config.borrow().rem;
        let cx = EvalContext {
            registry: &registry,
            topics,
            matcher: &*self.matcher,
            rem,
        };
        evaluate(name, atom, &cx)
    }
}

/// Builds a [`StyleRuntime`] with injected environment sources.
///
/// ```rust
/// use restyle_core::*;
///
/// let rt = StyleRuntime::builder()
///     .platform("web")
///     .storage(MemoryStorage::new())
///     .build();
/// assert_eq!(rt.topic("platform"), Some(TopicValue::from("web")));
/// ```
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    matcher: Box<dyn MediaMatcher>,
    appearance: Box<dyn Appearance>,
    storage: Box<dyn KeyValueStorage>,
    viewport: Option<Rc<dyn Viewport>>,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self {
            config: RuntimeConfig::default(),
            matcher: Box::new(DefaultMediaMatcher),
            appearance: Box::new(NoAppearance),
            storage: Box::new(NoStorage),
            viewport: None,
        }
    }
}

impl RuntimeBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn platform(mut self, platform: &str) -> Self {
        self.config.platform = platform.to_string();
        self
    }

    pub fn matcher(mut self, matcher: impl MediaMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    pub fn appearance(mut self, appearance: impl Appearance + 'static) -> Self {
        self.appearance = Box::new(appearance);
        self
    }

    pub fn storage(mut self, storage: impl KeyValueStorage + 'static) -> Self {
        self.storage = Box::new(storage);
        self
    }

    pub fn viewport(mut self, viewport: Rc<dyn Viewport>) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn build(self) -> StyleRuntime {
        let preprocessed = self.config.output_for_platform() == Output::Css;
        let rt = StyleRuntime {
            shared: Rc::new(Shared {
                config: RefCell::new(self.config),
                topics: RecordStore::default(),
                styles: RecordStore::default(),
                style_sets: RecordStore::default(),
                registry: RefCell::new(AtomRegistry::new()),
                warm: RefCell::new(HashMap::new()),
                preprocessed: Cell::new(preprocessed),
                matcher: self.matcher,
                appearance: self.appearance,
                storage: self.storage,
                viewport: RefCell::new(None),
                compile_hook: RefCell::new(None),
            }),
        };
        rt.reset();
        if let Some(viewport) = self.viewport {
            rt.set_dimensions(viewport);
        }
        rt
    }
}

/// Handle to one style runtime. Clones share state.
#[derive(Clone)]
pub struct StyleRuntime {
    shared: Rc<Shared>,
}

impl Default for StyleRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleRuntime {
    /// A runtime with default collaborators: no OS appearance, no
    /// persistence, no viewport.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    fn from_weak(weak: &Weak<Shared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    // Lifecycle

    /// Tears down every subscription, empties all stores and reseeds the
    /// environment topics and the structural atoms. Idempotent.
    pub fn reset(&self) {
        self.teardown();

        let shared = &self.shared;
        shared.styles.replace(Record::new());
        shared.style_sets.replace(Record::new());
        shared.topics.replace(self.initial_topics());

        let viewport = shared
            .viewport
            .borrow()
            .as_ref()
            .map(|binding| binding.viewport.clone());
        if let Some(viewport) = viewport {
            self.set_dimensions(viewport);
        }

        let structural = STRUCTURAL_ATOMS
            .iter()
            .map(|(name, flag)| (name.to_string(), Rc::new(Atom::structural(flag))))
            .collect();
        if let Err(err) = self.register(structural) {
            log::warn!("failed to seed structural atoms: {err}");
        }
    }

    /// Releases every subscription the runtime holds. Stores keep their
    /// last values.
    pub fn dispose(&self) {
        self.teardown();
        let binding = self.shared.viewport.borrow_mut().take();
        if let Some(binding) = binding {
            binding.subscription.unsubscribe();
        }
    }

    fn teardown(&self) {
        let atoms = self.shared.registry.borrow_mut().clear();
        for subscription in atoms {
            subscription.unsubscribe();
        }
        let warm: Vec<_> = self.shared.warm.borrow_mut().drain().collect();
        for (_, subscription) in warm {
            subscription.unsubscribe();
        }
    }

    fn initial_topics(&self) -> Record<TopicValue> {
        let (platform, storage_key) = {
            let config = self.shared.config.borrow();
            (config.platform.clone(), config.storage_key.clone())
        };
        let (scheme, setting) = self.initial_color_scheme(&storage_key);

        Record::from([
            (PLATFORM.to_string(), TopicValue::from(platform)),
            (COLOR_SCHEME.to_string(), scheme.as_str().into()),
            (COLOR_SCHEME_SYSTEM.to_string(), setting.as_str().into()),
            (WIDTH.to_string(), 0.into()),
            (HEIGHT.to_string(), 0.into()),
            (ORIENTATION.to_string(), Orientation::Portrait.as_str().into()),
        ])
    }

    /// A persisted `light` or `dark` is the starting scheme and stays pinned;
    /// anything else follows the OS.
    fn initial_color_scheme(&self, storage_key: &str) -> (ColorScheme, ColorSchemeSetting) {
        match self.shared.storage.get_item(storage_key) {
            Ok(Some(stored)) => match stored.parse::<ColorSchemeSetting>() {
                Ok(ColorSchemeSetting::Light) => {
                    return (ColorScheme::Light, ColorSchemeSetting::Light);
                }
                Ok(ColorSchemeSetting::Dark) => {
                    return (ColorScheme::Dark, ColorSchemeSetting::Dark);
                }
                Ok(ColorSchemeSetting::System) => {}
                Err(()) => log::debug!("ignoring persisted color scheme `{stored}`"),
            },
            Ok(None) => {}
            Err(err) => log::debug!("color scheme not restored: {err}"),
        }
        (self.system_color_scheme(), ColorSchemeSetting::System)
    }

    fn system_color_scheme(&self) -> ColorScheme {
        self.shared.appearance.color_scheme().unwrap_or_default()
    }

    // Producer

    /// Registers or replaces atoms and merges their evaluated styles into the
    /// style store in one write. Ignored while styles are preprocessed.
    pub fn create<S: Into<String>>(
        &self,
        atoms: impl IntoIterator<Item = (S, Atom)>,
    ) -> Result<(), StyleError> {
        if self.is_preprocessed() {
            log::debug!("styles are preprocessed; ignoring create");
            return Ok(());
        }
        let atoms = atoms
            .into_iter()
            .map(|(name, atom)| (name.into(), Rc::new(atom)))
            .collect();
        self.register(atoms)
    }

    /// [`create`](Self::create) from the compiler's JSON output: an object
    /// mapping atom names to atoms.
    /// Atoms are registered in document order.
    pub fn create_from_json(&self, json: &str) -> Result<(), StyleError> {
        let document: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let atoms = document
            .into_iter()
            .map(|(name, value)| Ok((name, Atom::from_value(value)?)))
            .collect::<Result<Vec<_>, StyleError>>()?;
        self.create(atoms)
    }

    fn register(&self, atoms: Vec<(String, Rc<Atom>)>) -> Result<(), StyleError> {
        let cycle = self.shared.registry.borrow().find_cycle(&atoms);
        if let Some(path) = cycle {
            return Err(StyleError::ChildCycle { path });
        }
        log::debug!("registering {} atoms", atoms.len());

        for (name, atom) in &atoms {
            let previous = self.shared.registry.borrow_mut().take_subscription(name);
            if let Some(previous) = previous {
                previous.unsubscribe();
            }
            let subscription = self.subscribe_atom(name, atom);
            let replaced = self
                .shared
                .registry
                .borrow_mut()
                .insert(name.clone(), atom.clone(), subscription);
            if let Some(replaced) = replaced {
                replaced.unsubscribe();
            }
        }

        let topics = self.shared.topics.get();
        let mut batch = Evaluated::new();
        for (name, atom) in &atoms {
            batch.extend(self.shared.evaluate_atom(name, atom, &topics));
        }
        self.shared.styles.set(batch);
        Ok(())
    }

    /// Re-evaluates `atom` whenever one of its topics or custom properties
    /// changes. Atoms without dependencies get no subscription.
    fn subscribe_atom(&self, name: &str, atom: &Rc<Atom>) -> Option<Subscription> {
        let dependencies = atom.dependencies();
        if dependencies.is_empty() {
            return None;
        }

        let weak = Rc::downgrade(&self.shared);
        let name = name.to_string();
        let atom = atom.clone();
        Some(self.shared.topics.subscribe(move |new, old| {
            if !dependencies.iter().any(|key| entry_changed(new, old, key)) {
                return;
            }
            let Some(shared) = weak.upgrade() else {
                return;
            };
            log::trace!("recomputing `{name}`");
            let evaluated = shared.evaluate_atom(&name, &atom, new);
            shared.styles.set(evaluated);
        }))
    }

    // Consumer

    /// Flattens and subscribes every composite key not yet warm. Each entry
    /// is a list of atom names in use order.
    pub fn warm_cache<I, T, S>(&self, token_sets: I)
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut batch = Record::new();
        for set in token_sets {
            let tokens: Vec<String> = set.into_iter().map(Into::into).collect();
            let key = cache::join_key(&tokens);
            if key.is_empty() || self.shared.warm.borrow().contains_key(&key) {
                continue;
            }
            log::trace!("warming `{key}`");

            batch.insert(key.clone(), cache::flatten(&tokens, &self.shared.styles.get()));

            let subscription = self.subscribe_style_set(key.clone(), tokens);
            self.shared.warm.borrow_mut().insert(key, subscription);
        }
        if !batch.is_empty() {
            self.shared.style_sets.set(batch);
        }
    }

    fn subscribe_style_set(&self, key: String, tokens: Vec<String>) -> Subscription {
        let weak = Rc::downgrade(&self.shared);
        self.shared
            .styles
            .subscribe(move |new: &AtomStyles, old: &AtomStyles| {
                if !cache::constituents_changed(&tokens, new, old) {
                    return;
                }
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let flat = cache::flatten(&tokens, new);
                shared.style_sets.set(Record::from([(key.clone(), flat)]));
            })
    }

    /// Resolves `class_name` for one component instance, warming its key on
    /// first use.
    pub fn resolve(&self, class_name: &str, state: &ComponentState) -> SyncStyle {
        let active = {
            let registry = self.shared.registry.borrow();
            resolve_active(class_name, state, |token| registry.get(token))
        };
        if !active.key.is_empty() && !self.shared.warm.borrow().contains_key(&active.key) {
            self.warm_cache([active.tokens.to_vec()]);
        }

        let (child_classes, meta) = self.shared.registry.borrow().describe(&active.tokens);
        SyncStyle {
            styles: self
                .shared
                .style_sets
                .entry(&active.key)
                .unwrap_or_else(empty_style_list),
            child_classes,
            meta,
            conditions: active.conditions,
            key: active.key,
        }
    }

    /// [`resolve`](Self::resolve) plus a subscription that calls `on_change`
    /// with the new styles whenever this key's style set is replaced. The
    /// subscription joins the current [`Scope`](crate::Scope), if any.
    pub fn use_sync(
        &self,
        class_name: &str,
        state: &ComponentState,
        on_change: impl Fn(StyleList) + 'static,
    ) -> (SyncStyle, Subscription) {
        let resolved = self.resolve(class_name, state);
        let key = resolved.key.clone();
        let style_sets = self.shared.style_sets.clone();
        let subscription = effect(move || {
            style_sets.subscribe_key(key, move |entry| {
                on_change(entry.cloned().unwrap_or_else(empty_style_list))
            })
        });
        (resolved, subscription)
    }

    // Environment

    /// Pins `light`/`dark`, or follows the OS for `system` / `None`. The
    /// resolved scheme is persisted best-effort and returned.
    pub fn set_color_scheme(&self, setting: Option<ColorSchemeSetting>) -> ColorScheme {
        let setting = setting.unwrap_or_default();
        let scheme = match setting {
            ColorSchemeSetting::Light => ColorScheme::Light,
            ColorSchemeSetting::Dark => ColorScheme::Dark,
            ColorSchemeSetting::System => self.system_color_scheme(),
        };

        self.shared.topics.set(Record::from([
            (COLOR_SCHEME.to_string(), scheme.as_str().into()),
            (COLOR_SCHEME_SYSTEM.to_string(), setting.as_str().into()),
        ]));

        let storage_key = self.shared.config.borrow().storage_key.clone();
        if let Err(err) = self.shared.storage.set_item(&storage_key, scheme.as_str()) {
            log::debug!("color scheme not persisted: {err}");
        }
        scheme
    }

    /// Pins the opposite of the scheme currently in effect. While following
    /// the OS, the OS is asked for the current scheme first.
    pub fn toggle_color_scheme(&self) -> ColorScheme {
        let topics = self.shared.topics.get();
        let view = TopicView(&topics);
        let current = match view.color_scheme_setting() {
            ColorSchemeSetting::System => self
                .shared
                .appearance
                .color_scheme()
                .unwrap_or_else(|| view.color_scheme()),
            _ => view.color_scheme(),
        };
        self.set_color_scheme(Some(current.toggled().into()))
    }

    /// Feeds an OS theme change. Only applies while following the system.
    pub fn system_appearance_changed(&self, scheme: Option<ColorScheme>) {
        if self.color_scheme_setting() != ColorSchemeSetting::System {
            return;
        }
        let scheme = scheme.unwrap_or_default();
        self.shared.topics.set(Record::from([(
            COLOR_SCHEME.to_string(),
            scheme.as_str().into(),
        )]));
    }

    /// Merges custom properties into the topic store. Keys without the `--`
    /// prefix are dropped.
    pub fn set_custom_properties<K, V>(&self, properties: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<TopicValue>,
    {
        let mut partial = Record::new();
        for (key, value) in properties {
            let key = key.into();
            if !is_custom_property(&key) {
                log::warn!("custom property `{key}` must start with `--`; dropped");
                continue;
            }
            partial.insert(key, value.into());
        }
        if !partial.is_empty() {
            self.shared.topics.set(partial);
        }
    }

    /// Reads the window size from `viewport` and follows its changes. A
    /// previously installed viewport is detached first.
    pub fn set_dimensions(&self, viewport: Rc<dyn Viewport>) {
        let previous = self.shared.viewport.borrow_mut().take();
        if let Some(previous) = previous {
            previous.subscription.unsubscribe();
        }

        if let Some(size) = viewport.get("window") {
            self.set_window_size(size.width, size.height);
        }

        let weak = Rc::downgrade(&self.shared);
        let subscription = viewport.add_change_listener(Rc::new(move |size: &WindowSize| {
            if let Some(rt) = StyleRuntime::from_weak(&weak) {
                rt.set_window_size(size.width, size.height);
            }
        }));
        *self.shared.viewport.borrow_mut() = Some(ViewportBinding {
            viewport,
            subscription,
        });
    }

    pub fn set_window_size(&self, width: f64, height: f64) {
        let orientation = Orientation::from_size(width, height);
        self.shared.topics.set(Record::from([
            (WIDTH.to_string(), width.into()),
            (HEIGHT.to_string(), height.into()),
            (ORIENTATION.to_string(), orientation.as_str().into()),
        ]));
    }

    pub fn set_topic(&self, key: &str, value: impl Into<TopicValue>) {
        self.shared
            .topics
            .set(Record::from([(key.to_string(), value.into())]));
    }

    // Administrative

    pub fn is_preprocessed(&self) -> bool {
        self.shared.preprocessed.get()
    }

    /// Selects the output for the current platform (falling back to the
    /// `default` entry). `css` turns [`create`](Self::create) into a no-op.
    pub fn set_output(&self, outputs: &BTreeMap<String, Output>) {
        let mut config = self.shared.config.borrow_mut();
        let output = select_output(outputs, &config.platform);
        config.output = outputs.clone();
        self.shared.preprocessed.set(output == Output::Css);
    }

    pub fn set_dangerously_compile_styles(&self, hook: impl Fn(&str, &StyleRuntime) + 'static) {
        *self.shared.compile_hook.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn dangerously_compile_styles(&self) -> Option<CompileHook> {
        self.shared.compile_hook.borrow().clone()
    }

    // Reads

    pub fn topics(&self) -> Rc<Record<TopicValue>> {
        self.shared.topics.get()
    }

    pub fn topic(&self, key: &str) -> Option<TopicValue> {
        self.shared.topics.entry(key)
    }

    pub fn color_scheme(&self) -> ColorScheme {
        TopicView(&self.shared.topics.get()).color_scheme()
    }

    pub fn color_scheme_setting(&self) -> ColorSchemeSetting {
        TopicView(&self.shared.topics.get()).color_scheme_setting()
    }

    pub fn platform(&self) -> String {
        self.shared.config.borrow().platform.clone()
    }

    pub fn atom(&self, name: &str) -> Option<Rc<Atom>> {
        self.shared.registry.borrow().get(name)
    }

    /// `None` when the atom is unknown or currently inactive.
    pub fn atom_styles(&self, name: &str) -> Option<StyleList> {
        self.shared.styles.entry(name).flatten()
    }

    pub fn style_set(&self, key: &str) -> Option<StyleList> {
        self.shared.style_sets.entry(key)
    }

    pub fn atom_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .shared
            .registry
            .borrow()
            .names()
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    pub fn warm_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.shared.warm.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn subscribe_topics(
        &self,
        f: impl Fn(&Record<TopicValue>, &Record<TopicValue>) + 'static,
    ) -> Subscription {
        self.shared.topics.subscribe(f)
    }

    /// Calls `f` whenever the style store entry of `name` changes.
    pub fn subscribe_atom_styles(
        &self,
        name: &str,
        f: impl Fn(Option<StyleList>) + 'static,
    ) -> Subscription {
        self.shared
            .styles
            .subscribe_key(name, move |entry| f(entry.cloned().flatten()))
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            atoms: self.shared.registry.borrow().len(),
            topic_listeners: self.shared.topics.listener_count(),
            style_listeners: self.shared.styles.listener_count(),
            style_set_listeners: self.shared.style_sets.listener_count(),
            warm_keys: self.shared.warm.borrow().len(),
        }
    }
}

impl fmt::Debug for StyleRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleRuntime")
            .field("platform", &self.shared.config.borrow().platform)
            .field("preprocessed", &self.is_preprocessed())
            .field("stats", &self.stats())
            .finish()
    }
}
