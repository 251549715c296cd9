//! Crash-safe per-plugin key/value store.
//!
//! Each plugin owns one file, `{data_folder}/{plugin}.store.json`. The file
//! starts with a `sha256:<hex>` line covering the JSON body that follows.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! crash leaves either the old file or the new one.
//!
//! A body that fails to parse or does not match its checksum is corrupted.
//! Depending on [`StoreRecovery`] the store either starts empty (the plugin
//! rebuilds its state) or refuses to load.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use sentir_core::defaults::STORE_SUFFIX;
use sentir_core::{Error, Result, StateStore};

const CHECKSUM_PREFIX: &str = "sha256:";

/// What to do with a store that fails its integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreRecovery {
    /// Drop the corrupted contents and start empty.
    #[default]
    Discard,
    /// Surface a configuration error.
    Fail,
}

/// File-backed store, loaded lazily on first access.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    recovery: StoreRecovery,
    data: Option<BTreeMap<String, JsonValue>>,
    dirty: bool,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, recovery: StoreRecovery) -> Self {
        Self {
            path: path.into(),
            recovery,
            data: None,
            dirty: false,
        }
    }

    /// Store for `plugin` under `data_folder`.
    pub fn for_plugin(data_folder: &Path, plugin: &str, recovery: StoreRecovery) -> Self {
        Self::new(
            data_folder.join(format!("{}{}", plugin, STORE_SUFFIX)),
            recovery,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn loaded(&mut self) -> Result<&mut BTreeMap<String, JsonValue>> {
        if self.data.is_none() {
            self.data = Some(self.load()?);
        }
        Ok(self.data.get_or_insert_with(BTreeMap::new))
    }

    fn load(&self) -> Result<BTreeMap<String, JsonValue>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        match decode(&text) {
            Ok(data) => {
                debug!(path = %self.path.display(), keys = data.len(), "Loaded plugin store");
                Ok(data)
            }
            Err(reason) => match self.recovery {
                StoreRecovery::Discard => {
                    warn!(
                        path = %self.path.display(),
                        reason = %reason,
                        "Plugin store is corrupted, discarding"
                    );
                    Ok(BTreeMap::new())
                }
                StoreRecovery::Fail => Err(Error::Configuration(format!(
                    "plugin store {} is corrupted: {}",
                    self.path.display(),
                    reason
                ))),
            },
        }
    }

    fn write(&self, data: &BTreeMap<String, JsonValue>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string(data)?;
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            writeln!(file, "{}{}", CHECKSUM_PREFIX, checksum(&body))?;
            file.write_all(body.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn checksum(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

fn decode(text: &str) -> std::result::Result<BTreeMap<String, JsonValue>, String> {
    let (header, body) = text
        .split_once('\n')
        .ok_or_else(|| "missing checksum header".to_string())?;
    let expected = header
        .strip_prefix(CHECKSUM_PREFIX)
        .ok_or_else(|| "malformed checksum header".to_string())?;
    if checksum(body) != expected.trim() {
        return Err("checksum mismatch".to_string());
    }
    serde_json::from_str(body).map_err(|e| e.to_string())
}

impl StateStore for FileStore {
    fn get(&mut self, key: &str) -> Result<Option<JsonValue>> {
        Ok(self.loaded()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: JsonValue) -> Result<()> {
        self.loaded()?.insert(key.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<Option<JsonValue>> {
        let removed = self.loaded()?.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        Ok(removed)
    }

    fn keys(&mut self) -> Result<Vec<String>> {
        Ok(self.loaded()?.keys().cloned().collect())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(data) = &self.data {
            self.write(data)?;
        }
        self.dirty = false;
        Ok(())
    }
}
