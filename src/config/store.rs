//! Configuration store
//!
//! Owns the loaded config document and the path it came from. All mutations
//! go through [`ConfigStore::update`], which holds a single lock across
//! mutate-and-persist so an owner command can never race a scheduler write.
//! Writes are atomic (temp file + rename) and only committed to memory once
//! the file hit disk.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::info;

use super::types::{BotConfig, ConfigError, ReplySettings};

/// Shared handle to the loaded configuration.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    inner: Mutex<BotConfig>,
}

impl ConfigStore {
    /// Load and validate the config file at `path`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let document = read_document(&path)?;
        let config: BotConfig =
            serde_json::from_value(document).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        info!(path = %path.display(), "configuration loaded");
        Ok(Self {
            path,
            inner: Mutex::new(config),
        })
    }

    /// Build a store around an already-constructed config. Nothing is read
    /// from or written to `path` until the first `update`.
    pub fn with_config(path: impl Into<PathBuf>, config: BotConfig) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(config),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clone of the current document.
    pub fn snapshot(&self) -> BotConfig {
        self.inner.lock().clone()
    }

    /// Owner JID from the current document.
    pub fn owner_jid(&self) -> String {
        self.inner.lock().bot_owner_jid.clone()
    }

    /// Effective settings for one chat (overrides merged over defaults).
    pub fn effective_settings(&self, chat_jid: &str) -> ReplySettings {
        self.inner.lock().effective_settings(chat_jid)
    }

    /// Whether a chat may never receive auto-replies.
    pub fn is_excluded(&self, chat_jid: &str) -> bool {
        self.inner.lock().is_excluded(chat_jid)
    }

    /// Apply a mutation and persist it. The in-memory document is only
    /// replaced once the write succeeded, so a failed save leaves the
    /// running configuration unchanged.
    pub fn update<F>(&self, mutate: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut BotConfig),
    {
        let mut guard = self.inner.lock();
        let mut candidate = guard.clone();
        mutate(&mut candidate);

        let document =
            serde_json::to_value(&candidate).map_err(|e| ConfigError::Parse(e.to_string()))?;
        write_document(&self.path, &document)?;

        *guard = candidate;
        info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}

/// Read a config file into a raw JSON document. The file may contain JSON5
/// conveniences (comments, trailing commas).
pub fn read_document(path: &Path) -> Result<Value, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    json5::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Write a raw JSON document as pretty JSON, atomically (temp + rename).
pub fn write_document(path: &Path, document: &Value) -> Result<(), ConfigError> {
    let pretty =
        serde_json::to_string_pretty(document).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, pretty.as_bytes()).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)
}
