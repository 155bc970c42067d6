use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::StyleError;

/// Key used for [`Output`] selection when the platform has no entry.
pub const DEFAULT_OUTPUT_KEY: &str = "default";

/// Where a platform's styles come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    /// Atoms are registered and evaluated at runtime.
    #[default]
    Native,
    /// Styles were compiled ahead of time; `create` is a no-op.
    Css,
}

/// Runtime configuration.
///
/// ```json
/// { "platform": "web", "rem": 16, "output": { "web": "css", "default": "native" } }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub platform: String,
    /// Root font size in px used by the `rem` and `em` units.
    pub rem: f64,
    /// Key the resolved color scheme is persisted under.
    pub storage_key: String,
    pub output: BTreeMap<String, Output>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            rem: 14.0,
            storage_key: "restyle:color-scheme".to_string(),
            output: BTreeMap::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(json: &str) -> Result<Self, StyleError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Output selected for the configured platform, `default` otherwise.
    pub fn output_for_platform(&self) -> Output {
        select_output(&self.output, &self.platform)
    }
}

pub(crate) fn select_output(outputs: &BTreeMap<String, Output>, platform: &str) -> Output {
    outputs
        .get(platform)
        .or_else(|| outputs.get(DEFAULT_OUTPUT_KEY))
        .copied()
        .unwrap_or_default()
}
