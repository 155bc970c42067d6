#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use crate::evaluate::{EvalContext, evaluate};
    use crate::registry::AtomRegistry;
    use crate::*;

    fn counter() -> (Rc<Cell<usize>>, impl Fn(Option<StyleList>) + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move |_: Option<StyleList>| c.set(c.get() + 1))
    }

    fn number(list: &StyleList, layer: usize, prop: &str) -> Option<f64> {
        list.get(layer)?.get(prop)?.as_number()
    }

    fn string(list: &StyleList, layer: usize, prop: &str) -> Option<String> {
        list.get(layer)?.get(prop)?.as_str().map(str::to_string)
    }

    #[derive(Default)]
    struct TestViewport {
        size: Cell<WindowSize>,
        next_id: Cell<usize>,
        listeners: Rc<RefCell<Vec<(usize, ViewportListener)>>>,
    }

    impl TestViewport {
        fn new(width: f64, height: f64) -> Rc<Self> {
            let vp = Self::default();
            vp.size.set(WindowSize::new(width, height));
            Rc::new(vp)
        }

        fn resize(&self, width: f64, height: f64) {
            let size = WindowSize::new(width, height);
            self.size.set(size);
            let listeners: Vec<_> = self.listeners.borrow().iter().map(|(_, l)| l.clone()).collect();
            for listener in listeners {
                listener(&size);
            }
        }

        fn listener_count(&self) -> usize {
            self.listeners.borrow().len()
        }
    }

    impl Viewport for TestViewport {
        fn get(&self, surface: &str) -> Option<WindowSize> {
            (surface == "window").then(|| self.size.get())
        }

        fn add_change_listener(&self, listener: ViewportListener) -> Subscription {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            self.listeners.borrow_mut().push((id, listener));
            let listeners = self.listeners.clone();
            Subscription::new(move || listeners.borrow_mut().retain(|(i, _)| *i != id))
        }
    }

    #[test]
    fn test_unconditioned_layers_always_included() {
        let registry = AtomRegistry::new();
        let topics: Record<TopicValue> = Record::new();
        let cx = EvalContext {
            registry: &registry,
            topics: &topics,
            matcher: &DefaultMediaMatcher,
            rem: 14.0,
        };
        let atom = Atom::new([
            declaration([("color", "red")]),
            declaration([("padding", 4)]),
            declaration([("margin", 2)]),
        ]);

        let out = evaluate("x", &atom, &cx);
        let styles = out["x"].clone().unwrap();
        assert_eq!(styles.len(), 3);
        assert_eq!(number(&styles, 2, "margin"), Some(2.0));
    }

    #[test]
    fn test_selector_layer_never_included() {
        let registry = AtomRegistry::new();
        let mut topics: Record<TopicValue> = Record::new();
        topics.insert(COLOR_SCHEME.to_string(), TopicValue::from("dark"));
        let cx = EvalContext {
            registry: &registry,
            topics: &topics,
            matcher: &DefaultMediaMatcher,
            rem: 14.0,
        };
        let atom = Atom::new([
            declaration([("color", "red")]),
            declaration([("color", "blue")]),
        ])
        .with_at_rules(
            1,
            [
                AtRule::ColorScheme("dark".into()),
                AtRule::Selector(Some("group-hover".into())),
            ],
        );

        let styles = evaluate("x", &atom, &cx)["x"].clone().unwrap();
        assert_eq!(styles.len(), 1);
        assert_eq!(string(&styles, 0, "color").as_deref(), Some("red"));
    }

    #[test]
    fn test_structural_atoms_after_reset() {
        let rt = StyleRuntime::new();
        rt.create([("p-4", Atom::new([declaration([("padding", 16)])]))])
            .unwrap();
        rt.warm_cache([["p-4"]]);
        rt.reset();
        rt.reset();

        let group = rt.resolve("group", &ComponentState::new());
        assert!(group.styles.is_empty());
        assert_eq!(group.meta, Some(Meta::from([("group".to_string(), true)])));
        assert_eq!(
            rt.resolve("group-isolate", &ComponentState::new()).meta,
            Some(Meta::from([("groupIsolate".to_string(), true)]))
        );

        assert!(rt.atom("p-4").is_none());
        let stats = rt.stats();
        assert_eq!(stats.atoms, 3);
        assert_eq!(stats.topic_listeners, 0);
        assert_eq!(rt.warm_keys(), vec!["group".to_string(), "group-isolate".to_string()]);
    }

    #[test]
    fn test_undeclared_topic_does_not_recompute() {
        let rt = StyleRuntime::new();
        rt.create([(
            "w",
            Atom::new([declaration([("width", 1)])]).with_topics([WIDTH]),
        )])
        .unwrap();
        let (count, on_change) = counter();
        let _sub = rt.subscribe_atom_styles("w", on_change);

        rt.set_topic("other", 1);
        rt.set_custom_properties([("--brand", "red")]);
        rt.set_color_scheme(Some(ColorSchemeSetting::Dark));
        assert_eq!(count.get(), 0);

        rt.set_window_size(100.0, 50.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_recreate_replaces_subscription() {
        let rt = StyleRuntime::new();
        let atom = || Atom::new([declaration([("width", 1)])]).with_topics([WIDTH]);
        rt.create([("w", atom())]).unwrap();
        rt.create([("w", atom())]).unwrap();
        assert_eq!(rt.stats().topic_listeners, 1);

        let (count, on_change) = counter();
        let _sub = rt.subscribe_atom_styles("w", on_change);
        rt.set_window_size(320.0, 640.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_warm_cache_tracks_constituents() {
        let rt = StyleRuntime::new();
        rt.create([
            (
                "a",
                Atom::new([
                    declaration([("color", "red")]),
                    declaration([("color", "blue")]),
                ])
                .with_at_rules(1, [AtRule::media("(min-width: 500px)")])
                .with_topics([WIDTH]),
            ),
            ("b", Atom::new([declaration([("padding", 4)])])),
        ])
        .unwrap();
        rt.warm_cache([["a", "b"]]);

        let before = rt.style_set("a b").unwrap();
        assert_eq!(before.len(), 2);
        let b_styles = rt.atom_styles("b").unwrap();

        rt.set_window_size(800.0, 400.0);
        let after = rt.style_set("a b").unwrap();
        assert_eq!(after.len(), 3);
        assert_eq!(string(&after, 0, "color").as_deref(), Some("red"));
        assert_eq!(string(&after, 1, "color").as_deref(), Some("blue"));
        assert_eq!(number(&after, 2, "padding"), Some(4.0));
        assert!(Rc::ptr_eq(&b_styles, &rt.atom_styles("b").unwrap()));
    }

    #[test]
    fn test_even_condition_filters_key() {
        let rt = StyleRuntime::new();
        rt.create([
            (
                "even:bg",
                Atom::new([declaration([("backgroundColor", "gray")])]).with_conditions(["even"]),
            ),
            ("p-1", Atom::new([declaration([("padding", 4)])])),
        ])
        .unwrap();

        let third = rt.resolve("even:bg p-1", &ComponentState::new().with_nth_child(3));
        assert_eq!(third.key, "p-1");
        assert!(third.conditions.contains("even"));

        let fourth = rt.resolve("even:bg p-1", &ComponentState::new().with_nth_child(4));
        assert_eq!(fourth.key, "even:bg p-1");
        assert_eq!(fourth.styles.len(), 2);
    }

    #[test]
    fn test_flag_conditions_and_unknown_tokens() {
        let rt = StyleRuntime::new();
        rt.create([(
            "hover:opacity",
            Atom::new([declaration([("opacity", 0.5)])]).with_conditions(["hover", "enabled"]),
        )])
        .unwrap();

        let state = ComponentState::new().with("hover", true);
        let style = rt.resolve("nope hover:opacity", &state);
        assert_eq!(style.key, "");
        assert!(style.styles.is_empty());
        assert_eq!(
            style.conditions.into_iter().collect::<Vec<_>>(),
            vec!["enabled".to_string(), "hover".to_string()]
        );

        let style = rt.resolve("hover:opacity", &state.with("enabled", 1));
        assert_eq!(style.key, "hover:opacity");
    }

    #[test]
    fn test_toggle_from_dark_pin() {
        let rt = StyleRuntime::new();
        assert_eq!(rt.set_color_scheme(Some(ColorSchemeSetting::Dark)), ColorScheme::Dark);

        assert_eq!(rt.toggle_color_scheme(), ColorScheme::Light);
        assert_eq!(rt.topic(COLOR_SCHEME), Some(TopicValue::from("light")));
        assert_eq!(rt.topic(COLOR_SCHEME_SYSTEM), Some(TopicValue::from("light")));
    }

    #[test]
    fn test_toggle_while_following_system() {
        let rt = StyleRuntime::builder()
            .appearance(|| Some(ColorScheme::Dark))
            .build();
        assert_eq!(rt.color_scheme(), ColorScheme::Dark);
        assert_eq!(rt.color_scheme_setting(), ColorSchemeSetting::System);

        assert_eq!(rt.toggle_color_scheme(), ColorScheme::Light);
        assert_eq!(rt.color_scheme_setting(), ColorSchemeSetting::Light);
    }

    #[test]
    fn test_system_appearance_only_when_following() {
        let rt = StyleRuntime::new();
        rt.system_appearance_changed(Some(ColorScheme::Dark));
        assert_eq!(rt.color_scheme(), ColorScheme::Dark);

        rt.set_color_scheme(Some(ColorSchemeSetting::Light));
        rt.system_appearance_changed(Some(ColorScheme::Dark));
        assert_eq!(rt.color_scheme(), ColorScheme::Light);
    }

    #[test]
    fn test_orientation_from_dimensions() {
        let rt = StyleRuntime::new();
        let viewport = TestViewport::new(800.0, 400.0);
        rt.set_dimensions(viewport.clone());
        assert_eq!(rt.topic(ORIENTATION), Some(TopicValue::from("landscape")));

        viewport.resize(400.0, 800.0);
        assert_eq!(rt.topic(ORIENTATION), Some(TopicValue::from("portrait")));

        viewport.resize(500.0, 500.0);
        assert_eq!(rt.topic(ORIENTATION), Some(TopicValue::from("portrait")));
        assert_eq!(rt.topic(WIDTH), Some(TopicValue::from(500.0)));
    }

    #[test]
    fn test_set_dimensions_replaces_viewport() {
        let rt = StyleRuntime::new();
        let first = TestViewport::new(100.0, 200.0);
        let second = TestViewport::new(300.0, 200.0);
        rt.set_dimensions(first.clone());
        rt.set_dimensions(second.clone());
        assert_eq!(first.listener_count(), 0);
        assert_eq!(second.listener_count(), 1);

        first.resize(10.0, 10.0);
        assert_eq!(rt.topic(WIDTH), Some(TopicValue::from(300.0)));

        // Reset keeps the viewport bound.
        rt.reset();
        assert_eq!(second.listener_count(), 1);
        assert_eq!(rt.topic(WIDTH), Some(TopicValue::from(300.0)));

        rt.dispose();
        assert_eq!(second.listener_count(), 0);
    }

    #[test]
    fn test_reentrant_writes_are_queued() {
        let store = RecordStore::<TopicValue>::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let writer = store.clone();
        let _a = store.subscribe(move |new, old| {
            if entry_changed(new, old, "a") {
                writer.set(Record::from([("b".to_string(), 1.into())]));
            }
        });
        let s = seen.clone();
        let _b = store.subscribe(move |new, _old| {
            s.borrow_mut()
                .push((new.get("a").cloned(), new.get("b").cloned()));
        });

        store.set(Record::from([("a".to_string(), 1.into())]));
        assert_eq!(
            *seen.borrow(),
            vec![
                (Some(TopicValue::from(1)), None),
                (Some(TopicValue::from(1)), Some(TopicValue::from(1))),
            ]
        );
    }

    #[test]
    fn test_store_update_merges_and_unsubscribes() {
        let store = RecordStore::<TopicValue>::new(Record::from([("a".to_string(), 1.into())]));
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let sub = store.subscribe_key("b", move |_| c.set(c.get() + 1));

        store.update(|current| {
            let a = current.get("a").and_then(TopicValue::as_number).unwrap_or(0.0);
            Record::from([("b".to_string(), (a + 1.0).into())])
        });
        assert_eq!(store.entry("a"), Some(TopicValue::from(1)));
        assert_eq!(store.entry("b"), Some(TopicValue::from(2.0)));
        assert_eq!(calls.get(), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        store.set(Record::from([("b".to_string(), 3.into())]));
        assert_eq!(calls.get(), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_scope_dispose_unsubscribes_hooks() {
        let rt = StyleRuntime::new();
        let scope = Scope::new();
        let (_style, sub) = scope.run(|| rt.use_sync("group", &ComponentState::new(), |_| {}));
        assert_eq!(rt.stats().style_set_listeners, 1);
        assert!(sub.is_active());

        scope.dispose();
        assert_eq!(rt.stats().style_set_listeners, 0);
        assert!(!sub.is_active());
    }

    #[test]
    fn test_use_sync_reports_key_changes() {
        let rt = StyleRuntime::new();
        rt.create([(
            "dark:text",
            Atom::new([declaration([("color", "white")])])
                .with_at_rules(0, [AtRule::ColorScheme("dark".into())])
                .with_topics([COLOR_SCHEME]),
        )])
        .unwrap();

        let latest = Rc::new(RefCell::new(None));
        let l = latest.clone();
        let (style, _sub) = rt.use_sync("dark:text", &ComponentState::new(), move |styles| {
            *l.borrow_mut() = Some(styles.len());
        });
        assert!(style.styles.is_empty());

        rt.set_color_scheme(Some(ColorSchemeSetting::Dark));
        assert_eq!(*latest.borrow(), Some(1));
    }

    #[test]
    fn test_child_cascade_follows_parent_gate() {
        let rt = StyleRuntime::new();
        rt.create([
            ("child", Atom::new([declaration([("color", "red")])])),
            (
                "md:parent",
                Atom::new([declaration([("display", "flex")])])
                    .with_at_rules(0, [AtRule::media("(min-width: 500px)")])
                    .with_children(["child", "ghost"])
                    .with_topics([WIDTH]),
            ),
        ])
        .unwrap();
        assert!(rt.atom_styles("child").is_none());
        assert!(rt.atom_styles("ghost").is_none());

        rt.set_window_size(800.0, 400.0);
        assert_eq!(rt.atom_styles("child").map(|s| s.len()), Some(1));
        assert_eq!(rt.atom_styles("md:parent").map(|s| s.len()), Some(1));

        rt.warm_cache([vec!["md:parent"], vec!["md:parent", "child"]]);
        assert_eq!(
            rt.resolve("md:parent", &ComponentState::new()).child_classes,
            Some(vec!["child".to_string(), "ghost".to_string()])
        );
        assert_eq!(rt.style_set("md:parent child").map(|s| s.len()), Some(2));

        // Turning the parent off again clears its children.
        rt.set_window_size(300.0, 400.0);
        assert!(rt.atom_styles("child").is_none());
        assert_eq!(rt.atom_styles("md:parent").map(|s| s.len()), Some(0));
        assert_eq!(rt.style_set("md:parent child").map(|s| s.len()), Some(0));
    }

    #[test]
    fn test_recreate_replaces_meta_and_children() {
        let rt = StyleRuntime::new();
        rt.create([(
            "a",
            Atom::new([declaration([("color", "red")])])
                .with_meta("text", true)
                .with_children(["x"]),
        )])
        .unwrap();
        let first = rt.resolve("a", &ComponentState::new());
        assert_eq!(first.meta, Some(Meta::from([("text".to_string(), true)])));
        assert_eq!(first.child_classes, Some(vec!["x".to_string()]));

        rt.create([(
            "a",
            Atom::new([declaration([("color", "blue")])]).with_meta("view", true),
        )])
        .unwrap();
        let second = rt.resolve("a", &ComponentState::new());
        assert_eq!(second.meta, Some(Meta::from([("view".to_string(), true)])));
        assert_eq!(second.child_classes, None);
        assert_eq!(string(&second.styles, 0, "color").as_deref(), Some("blue"));
    }

    #[test]
    fn test_child_cycle_is_rejected() {
        let rt = StyleRuntime::new();
        let err = rt
            .create([
                ("a", Atom::new([]).with_children(["b"])),
                ("b", Atom::new([]).with_children(["a"])),
            ])
            .unwrap_err();
        assert!(matches!(err, StyleError::ChildCycle { .. }));
        assert_eq!(err.to_string(), "child class cycle: a -> b -> a");
        assert!(rt.atom("a").is_none());
    }

    #[test]
    fn test_create_from_json() {
        let rt = StyleRuntime::new();
        rt.create_from_json(
            r#"{
                "w-half": {
                    "styles": [{ "width": { "value": 50, "units": ["vw"] } }],
                    "topics": ["width"]
                },
                "rotate": {
                    "styles": [{ "transform": [{ "rotate": { "value": 45, "units": ["deg"] } }] }]
                },
                "dark:text": {
                    "styles": [{ "color": "black" }, { "color": "white" }],
                    "atRules": { "1": [["colorScheme", "dark"]] },
                    "topics": ["colorScheme"],
                    "meta": { "text": true }
                }
            }"#,
        )
        .unwrap();

        rt.set_window_size(400.0, 800.0);
        let width = rt.atom_styles("w-half").unwrap();
        assert_eq!(number(&width, 0, "width"), Some(200.0));

        // Nested objects are literals.
        let rotate = rt.atom_styles("rotate").unwrap();
        assert!(matches!(rotate[0].get("transform"), Some(StyleValue::Array(_))));

        assert_eq!(rt.atom_styles("dark:text").map(|s| s.len()), Some(1));
        rt.set_color_scheme(Some(ColorSchemeSetting::Dark));
        let text = rt.atom_styles("dark:text").unwrap();
        assert_eq!(string(&text, 1, "color").as_deref(), Some("white"));
    }

    #[test]
    fn test_create_from_json_keeps_document_order() {
        let json = r#"{
            "b-child": { "styles": [{ "opacity": 1 }] },
            "a-parent": {
                "styles": [{ "display": "flex" }],
                "atRules": { "0": [["media", "(min-width: 5000px)"]] },
                "childClasses": ["b-child"]
            }
        }"#;

        let from_json = StyleRuntime::new();
        from_json.create_from_json(json).unwrap();

        let programmatic = StyleRuntime::new();
        programmatic
            .create([
                ("b-child", Atom::new([declaration([("opacity", 1)])])),
                (
                    "a-parent",
                    Atom::new([declaration([("display", "flex")])])
                        .with_at_rules(0, [AtRule::media("(min-width: 5000px)")])
                        .with_children(["b-child"]),
                ),
            ])
            .unwrap();

        assert!(programmatic.atom_styles("b-child").is_none());
        assert!(from_json.atom_styles("b-child").is_none());
    }

    #[test]
    fn test_unknown_unit_fails_registration() {
        let rt = StyleRuntime::new();
        let err = rt
            .create_from_json(
                r#"{ "w": { "styles": [{ "width": { "value": 1, "units": ["furlong"] } }] } }"#,
            )
            .unwrap_err();
        assert!(matches!(err, StyleError::Json(_)));
        assert!(err.to_string().contains("unknown unit `furlong`"));
        assert!(rt.atom("w").is_none());
    }

    #[test]
    fn test_preprocessed_create_is_noop() {
        let rt = StyleRuntime::builder().platform("web").build();
        assert!(!rt.is_preprocessed());

        rt.set_output(&BTreeMap::from([
            ("web".to_string(), Output::Css),
            ("default".to_string(), Output::Native),
        ]));
        assert!(rt.is_preprocessed());
        rt.create([("p-4", Atom::new([declaration([("padding", 16)])]))])
            .unwrap();
        assert!(rt.atom("p-4").is_none());

        // Structural atoms are seeded regardless.
        rt.reset();
        assert!(rt.atom("group").is_some());

        let config = RuntimeConfig::from_json(r#"{ "platform": "ios", "output": { "default": "css" } }"#)
            .unwrap();
        assert!(StyleRuntime::builder().config(config).build().is_preprocessed());
    }

    #[test]
    fn test_persisted_color_scheme() {
        let storage = MemoryStorage::new().with_item("restyle:color-scheme", "dark");
        let rt = StyleRuntime::builder().storage(storage.clone()).build();
        assert_eq!(rt.color_scheme(), ColorScheme::Dark);
        assert_eq!(rt.color_scheme_setting(), ColorSchemeSetting::Dark);

        rt.set_color_scheme(None);
        assert_eq!(
            storage.get_item("restyle:color-scheme"),
            Ok(Some("light".to_string()))
        );
        assert_eq!(rt.color_scheme(), ColorScheme::Light);

        // Following a dark OS persists the resolved scheme.
        let storage = MemoryStorage::new();
        let rt = StyleRuntime::builder()
            .storage(storage.clone())
            .appearance(|| Some(ColorScheme::Dark))
            .build();
        assert_eq!(rt.set_color_scheme(None), ColorScheme::Dark);
        assert_eq!(
            storage.get_item("restyle:color-scheme"),
            Ok(Some("dark".to_string()))
        );
        let next = StyleRuntime::builder().storage(storage).build();
        assert_eq!(next.color_scheme(), ColorScheme::Dark);

        // Storage failures fall back to the OS scheme.
        let rt = StyleRuntime::builder()
            .appearance(|| Some(ColorScheme::Dark))
            .build();
        assert_eq!(rt.color_scheme(), ColorScheme::Dark);
        assert_eq!(rt.set_color_scheme(Some(ColorSchemeSetting::Light)), ColorScheme::Light);
    }

    #[test]
    fn test_custom_properties_and_var() {
        let rt = StyleRuntime::new();
        rt.create([(
            "text-brand",
            Atom::new([declaration([("color", "var(--brand, red)")])])
                .with_custom_properties(["--brand"]),
        )])
        .unwrap();
        let color = || string(&rt.atom_styles("text-brand").unwrap(), 0, "color");
        assert_eq!(color().as_deref(), Some("red"));

        rt.set_custom_properties([("--brand", "blue"), ("brand", "green")]);
        assert_eq!(color().as_deref(), Some("blue"));
        assert_eq!(rt.topic("brand"), None);
    }

    #[test]
    fn test_custom_matcher_handles_other_rules() {
        let rt = StyleRuntime::builder()
            .matcher(|rule: &str, _params: Option<&str>, _env: &MediaEnv<'_>| rule == "supports")
            .build();
        rt.create([(
            "grid",
            Atom::new([declaration([("display", "grid")])])
                .with_at_rules(0, [AtRule::new("supports", Some("(display: grid)")).unwrap()]),
        )])
        .unwrap();
        assert_eq!(rt.atom_styles("grid").map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_runtime_locals() {
        let (outside, sub) = use_sync("group", &ComponentState::new(), |_| {});
        assert_eq!(outside, SyncStyle::default());
        assert!(!sub.is_active());

        let rt = StyleRuntime::new();
        let key = with_runtime(&rt, || {
            assert!(current_runtime().is_some());
            use_sync("group", &ComponentState::new(), |_| {}).0.key
        });
        assert_eq!(key, "group");
        assert!(current_runtime().is_none());
    }

    #[test]
    fn test_compile_hook_is_stored() {
        let rt = StyleRuntime::new();
        assert!(rt.dangerously_compile_styles().is_none());

        let seen = Rc::new(RefCell::new(String::new()));
        let s = seen.clone();
        rt.set_dangerously_compile_styles(move |css, _rt| s.borrow_mut().push_str(css));

        let hook = rt.dangerously_compile_styles().unwrap();
        hook(".p-4 { padding: 1rem }", &rt);
        assert_eq!(&*seen.borrow(), ".p-4 { padding: 1rem }");
    }
}
