//! Persistent client-key store.
//!
//! One JSON file per process, shared by every connection manager.
//! Schema: `{ "keys": { "<connection-url>": "<client-key>" } }` — the
//! whole file is rewritten on every change, no partial updates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Errors from key persistence.
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk shape of the key file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct KeysFile {
    keys: HashMap<String, String>,
}

/// Durable cross-restart memory of the last-known client key per TV.
///
/// Keys are cached in memory and persisted to a JSON file. Update and
/// file rewrite happen under one mutex guard, so renewals from
/// different managers sharing the store cannot lose each other's
/// entries.
pub struct KeyStore {
    path: PathBuf,
    keys: Mutex<HashMap<String, String>>,
}

impl KeyStore {
    /// Opens the store, loading any existing keys from disk.
    ///
    /// A missing file means no TV has paired yet. A read or parse
    /// failure is logged and treated the same: every endpoint starts
    /// unpaired and goes through one extra pairing round-trip.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let keys = match load_keys(&path) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load key store, starting empty");
                HashMap::new()
            }
        };
        Self {
            path,
            keys: Mutex::new(keys),
        }
    }

    /// Returns the stored key for a connection URL, empty if unpaired.
    pub fn get(&self, url: &str) -> String {
        self.keys
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the key for a connection URL and rewrites the file.
    pub fn renew(&self, url: &str, key: &str) -> Result<(), KeyStoreError> {
        let entries = {
            let mut guard = self.keys.lock().unwrap();
            guard.insert(url.to_string(), key.to_string());
            // Persist inside the critical section: concurrent renewals
            // from different endpoints must not interleave file writes.
            let file = KeysFile {
                keys: guard.clone(),
            };
            let json = serde_json::to_string_pretty(&file)?;
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, json)?;
            guard.len()
        };
        debug!(path = %self.path.display(), entries, "persisted key store");
        Ok(())
    }
}

/// Loads the key map from disk.
fn load_keys(path: &Path) -> Result<HashMap<String, String>, KeyStoreError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let data = std::fs::read_to_string(path)?;
    let file: KeysFile = serde_json::from_str(&data)?;
    debug!(entries = file.keys.len(), path = %path.display(), "loaded key store");
    Ok(file.keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, KeyStore) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("keys.json");
        let store = KeyStore::open(path);
        (tmp, store)
    }

    #[test]
    fn new_store_returns_empty_key() {
        let (_tmp, store) = test_store();
        assert_eq!(store.get("ws://192.168.0.10:3000"), "");
    }

    #[test]
    fn renew_and_get() {
        let (_tmp, store) = test_store();
        store.renew("ws://192.168.0.10:3000", "abc").unwrap();
        assert_eq!(store.get("ws://192.168.0.10:3000"), "abc");
    }

    #[test]
    fn persist_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("keys.json");

        {
            let store = KeyStore::open(path.clone());
            store.renew("ws://tv-a:3000", "key-a").unwrap();
            store.renew("wss://tv-b:3001", "key-b").unwrap();
        }

        // Reload from disk.
        let store2 = KeyStore::open(path);
        assert_eq!(store2.get("ws://tv-a:3000"), "key-a");
        assert_eq!(store2.get("wss://tv-b:3001"), "key-b");
    }

    #[test]
    fn file_uses_keys_wrapper_schema() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("keys.json");
        let store = KeyStore::open(path.clone());
        store.renew("ws://tv:3000", "k1").unwrap();

        let data = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(json["keys"]["ws://tv:3000"], "k1");
    }

    #[test]
    fn overwrite_key() {
        let (_tmp, store) = test_store();
        store.renew("ws://tv:3000", "old").unwrap();
        store.renew("ws://tv:3000", "new").unwrap();
        assert_eq!(store.get("ws://tv:3000"), "new");
    }

    #[test]
    fn corrupt_file_falls_back_to_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("keys.json");
        std::fs::write(&path, "not json {{{").unwrap();

        let store = KeyStore::open(path);
        assert_eq!(store.get("ws://tv:3000"), "");
    }

    #[test]
    fn renew_preserves_other_entries() {
        let (_tmp, store) = test_store();
        store.renew("ws://tv-a:3000", "a").unwrap();
        store.renew("ws://tv-b:3000", "b").unwrap();
        assert_eq!(store.get("ws://tv-a:3000"), "a");
        assert_eq!(store.get("ws://tv-b:3000"), "b");
    }
}
