//! Key-value persistence port
//!
//! The console persists a handful of UI preferences (last prompt, statement
//! limit) through [`KeyValueStore`]. Tests use [`MemoryStore`]; the CLI uses a
//! JSON file in the user's home directory.

use crate::error::{GemmaError, GemmaResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Last prompt typed into the analysis box
pub const KEY_LAST_PROMPT: &str = "gemma.last_prompt";
/// Last statement limit chosen for a run
pub const KEY_MAX_STATEMENTS: &str = "gemma.max_statements";

/// String key-value storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> GemmaResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> GemmaResult<()>;

    async fn remove(&self, key: &str) -> GemmaResult<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> GemmaResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> GemmaResult<()> {
        self.values
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> GemmaResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// All keys in one pretty-printed JSON object on disk
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    /// Store at `~/.gemma/state.json`
    pub fn new() -> GemmaResult<Self> {
        let path = dirs::home_dir()
            .ok_or_else(|| GemmaError::storage("Home directory is not available"))?
            .join(".gemma")
            .join("state.json");
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> GemmaResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| storage_error(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            GemmaError::storage_with_path(
                format!("Corrupt state file: {}", e),
                self.path.display().to_string(),
            )
        })
    }

    async fn write_all(&self, values: &BTreeMap<String, String>) -> GemmaResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(parent, e))?;
        }
        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content)
            .await
            .map_err(|e| storage_error(&self.path, e))?;
        debug!(path = %self.path.display(), keys = values.len(), "State saved");
        Ok(())
    }
}

fn storage_error(path: &Path, error: std::io::Error) -> GemmaError {
    GemmaError::storage_with_path(error.to_string(), path.display().to_string())
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> GemmaResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> GemmaResult<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.read_all().await?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values).await
    }

    async fn remove(&self, key: &str) -> GemmaResult<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.read_all().await?;
        if values.remove(key).is_some() {
            self.write_all(&values).await?;
        }
        Ok(())
    }
}
