// ABOUTME: Persistent key/value storage for credentials and the composer draft.
// ABOUTME: FileStore keeps a flat JSON object on disk via atomic writes; MemoryStore backs tests.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Storage key for the composer draft.
pub const DRAFT_KEY: &str = "chat_draft";

/// String key/value persistence. Reads never fail: an unreadable store behaves as empty.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// JSON-file backed store. Every write rewrites the whole file (tmp + rename).
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Option<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Some(BTreeMap::new());
        }
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                debug!("storage read failed for {}: {}", self.path.display(), e);
                return None;
            }
        };
        if content.trim().is_empty() {
            return Some(BTreeMap::new());
        }
        match serde_json::from_str(&content) {
            Ok(map) => Some(map),
            Err(e) => {
                warn!("storage file {} is not valid JSON: {}", self.path.display(), e);
                None
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(map)
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        std::fs::write(&tmp_path, &content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;
        // A corrupt file is replaced rather than blocking every write.
        let mut map = self.read_map().unwrap_or_default();
        f(&mut map);
        self.write_map(&map)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_map()?.remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|map| {
            map.remove(key);
        })
    }
}

/// In-process store; contents vanish with the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }
}

fn poisoned() -> ClientError {
    ClientError::Io(std::io::Error::other("storage lock poisoned"))
}

/// Load the saved composer draft, if any.
pub fn load_draft(store: &dyn KeyValueStore) -> Option<String> {
    store.get(DRAFT_KEY).filter(|d| !d.is_empty())
}

/// Persist the composer draft; an empty draft removes the entry.
pub fn save_draft(store: &dyn KeyValueStore, draft: &str) {
    let result = if draft.is_empty() {
        store.remove(DRAFT_KEY)
    } else {
        store.set(DRAFT_KEY, draft)
    };
    if let Err(e) = result {
        warn!("failed to save draft: {}", e);
    }
}
