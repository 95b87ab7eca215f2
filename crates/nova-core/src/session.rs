//! Conversation identity
//!
//! A conversation id is created once per profile and persisted in a small
//! key-value store. The resolved id travels explicitly as a [`SessionContext`]
//! into every backend call.

use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

/// Storage key holding the conversation id.
pub const THREAD_ID_KEY: &str = "nova_thread_id";

/// Opaque correlation token for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The resolved identity for this run of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub conversation_id: ConversationId,
    /// True when the store was unusable and the id lives only in memory.
    pub ephemeral: bool,
}

impl SessionContext {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self { conversation_id, ephemeral: false }
    }

    pub fn thread_id(&self) -> &str {
        self.conversation_id.as_str()
    }
}

/// Durable string key-value storage scoped to one profile.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Returns the stored conversation id, creating and persisting one if absent.
///
/// Never fails: if the store can't be read or written, a fresh id is used for
/// this session only.
pub fn get_or_create_conversation_id(store: &dyn SessionStore) -> SessionContext {
    match store.get(THREAD_ID_KEY) {
        Ok(Some(existing)) if !existing.trim().is_empty() => {
            tracing::debug!(thread_id = %existing, "Reusing stored conversation id");
            SessionContext::new(ConversationId::from(existing))
        }
        Ok(_) => {
            let id = ConversationId::generate();
            match store.set(THREAD_ID_KEY, id.as_str()) {
                Ok(()) => {
                    tracing::info!(thread_id = %id, "Created new conversation id");
                    SessionContext::new(id)
                }
                Err(e) => {
                    tracing::warn!("Could not persist conversation id, using ephemeral id: {:#}", e);
                    SessionContext { conversation_id: id, ephemeral: true }
                }
            }
        }
        Err(e) => {
            tracing::warn!("Session store unavailable, using ephemeral id: {:#}", e);
            SessionContext { conversation_id: ConversationId::generate(), ephemeral: true }
        }
    }
}

/// JSON object file on disk, one file per profile.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// Store at `<config_dir>/nova/storage.json`.
    pub fn default_location() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(Self::new(config_dir.join("nova").join("storage.json")))
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(anyhow!("{} is not a JSON object", self.path.display())),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, content)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| anyhow!("session store lock poisoned"))
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.guard()?;
        let map = self.read_map()?;
        Ok(map.get(key).and_then(|v| v.as_str()).map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// In-process store, for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow!("memory store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}
