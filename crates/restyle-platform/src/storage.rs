use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use restyle_core::{KeyValueStorage, StorageError};

/// Preferences persisted as one flat JSON object on disk.
///
/// Every access reads or rewrites the whole file. A missing file reads as
/// empty.
#[derive(Clone, Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn store(&self, items: &BTreeMap<String, String>) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(items)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

fn io_error(err: anyhow::Error) -> StorageError {
    StorageError::Io(format!("{err:#}"))
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut items = self.load().map_err(io_error)?;
        Ok(items.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.load().map_err(io_error)?;
        items.insert(key.to_string(), value.to_string());
        self.store(&items).map_err(io_error)?;
        log::trace!("persisted `{key}` to {}", self.path.display());
        Ok(())
    }
}
