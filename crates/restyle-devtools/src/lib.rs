use serde::Serialize;
use serde_json::json;

use restyle_core::{StyleRuntime, TopicView};


#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub platform: String,
    pub color_scheme: String,
    pub color_scheme_setting: String,
    pub width: f64,
    pub height: f64,
    pub orientation: String,
    pub atoms: usize,
    pub warm_keys: usize,
    pub topic_listeners: usize,
    pub style_listeners: usize,
    pub style_set_listeners: usize,
}

pub struct Inspector {
    pub enabled: bool,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self { enabled: false }
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// The HUD line for this frame, when the inspector is on.
    pub fn frame(&self, rt: &StyleRuntime) -> Option<String> {
        self.enabled.then(|| Self::report(rt))
    }

    pub fn metrics(rt: &StyleRuntime) -> Metrics {
        let topics = rt.topics();
        let view = TopicView(&topics);
        let stats = rt.stats();
        Metrics {
            platform: view.platform().to_string(),
            color_scheme: view.color_scheme().as_str().to_string(),
            color_scheme_setting: view.color_scheme_setting().as_str().to_string(),
            width: view.width(),
            height: view.height(),
            orientation: view.orientation().as_str().to_string(),
            atoms: stats.atoms,
            warm_keys: stats.warm_keys,
            topic_listeners: stats.topic_listeners,
            style_listeners: stats.style_listeners,
            style_set_listeners: stats.style_set_listeners,
        }
    }

    pub fn report(rt: &StyleRuntime) -> String {
        let m = Self::metrics(rt);
        let lines = [
            format!("platform: {}", m.platform),
            format!("scheme: {} ({})", m.color_scheme, m.color_scheme_setting),
            format!("viewport: {}x{} {}", m.width, m.height, m.orientation),
            format!("atoms: {}", m.atoms),
            format!("style sets: {}", m.warm_keys),
            format!(
                "listeners: {} topic, {} style, {} style-set",
                m.topic_listeners, m.style_listeners, m.style_set_listeners
            ),
        ];
        lines.join("  |  ")
    }

    /// Pretty JSON of a registered atom and its current styles.
    pub fn dump_atom(rt: &StyleRuntime, name: &str) -> Option<String> {
        let atom = rt.atom(name)?;
        let styles = rt.atom_styles(name);
        let value = json!({
            "name": name,
            "active": styles.is_some(),
            "styles": styles.as_deref().unwrap_or(&[]),
            "dependencies": atom.dependencies().as_slice(),
            "conditions": atom.conditions,
            "childClasses": atom.child_classes,
            "meta": atom.meta,
        });
        to_pretty(&value)
    }

    /// Pretty JSON of a warm style set.
    pub fn dump_style_set(rt: &StyleRuntime, key: &str) -> Option<String> {
        let styles = rt.style_set(key)?;
        let value = json!({
            "key": key,
            "styles": &*styles,
        });
        to_pretty(&value)
    }
}

fn to_pretty(value: &serde_json::Value) -> Option<String> {
    match serde_json::to_string_pretty(value) {
        Ok(s) => Some(s),
        Err(err) => {
            log::warn!("devtools dump failed: {err}");
            None
        }
    }
}
