use restyle_core::topics::{HEIGHT, WIDTH};
use restyle_core::{
    Record, RecordStore, Subscription, TopicValue, TopicView, Viewport, ViewportListener,
    WindowSize, entry_changed,
};

/// Window metrics pushed by the host event loop.
///
/// Hand it to [`StyleRuntime::set_dimensions`](restyle_core::StyleRuntime::set_dimensions)
/// and call [`resize`](Self::resize) on every logical size change.
#[derive(Clone, Debug)]
pub struct WindowMetrics {
    store: RecordStore<TopicValue>,
}

impl WindowMetrics {
    pub fn new(size: WindowSize) -> Self {
        Self {
            store: RecordStore::new(size_record(size)),
        }
    }

    pub fn size(&self) -> WindowSize {
        let record = self.store.get();
        let view = TopicView(&record);
        WindowSize::new(view.width(), view.height())
    }

    /// Listeners only run when the size actually changed.
    pub fn resize(&self, width: f64, height: f64) {
        self.store.set(size_record(WindowSize::new(width, height)));
    }

    pub fn listener_count(&self) -> usize {
        self.store.listener_count()
    }
}

impl Default for WindowMetrics {
    fn default() -> Self {
        Self::new(WindowSize::default())
    }
}

fn size_record(size: WindowSize) -> Record<TopicValue> {
    Record::from([
        (WIDTH.to_string(), size.width.into()),
        (HEIGHT.to_string(), size.height.into()),
    ])
}

impl Viewport for WindowMetrics {
    fn get(&self, surface: &str) -> Option<WindowSize> {
        (surface == "window").then(|| self.size())
    }

    fn add_change_listener(&self, listener: ViewportListener) -> Subscription {
        self.store.subscribe(move |new, old| {
            if entry_changed(new, old, WIDTH) || entry_changed(new, old, HEIGHT) {
                let view = TopicView(new);
                listener(&WindowSize::new(view.width(), view.height()));
            }
        })
    }
}
