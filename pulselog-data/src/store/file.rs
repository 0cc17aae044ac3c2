use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::backend::{KeyChange, StoreBackend};
use super::errors::StoreError;

/// File-backed store: a single JSON document mapping keys to their raw
/// serialized values, shared between processes the way browser local
/// storage is shared between tabs.
///
/// Concurrent writers resolve last-write-wins at the document level; the
/// only cross-context propagation path is [`poll_external`], which diffs
/// the document against the last content this context has seen.
///
/// [`poll_external`]: StoreBackend::poll_external
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    /// Last document content seen by this context, used to tell our own
    /// writes apart from external ones.
    snapshot: Mutex<HashMap<String, String>>,
}

impl FileBackend {
    /// Open the store document at `path`, creating parent directories as
    /// needed. A missing document is an empty store; an unreadable or
    /// corrupt one starts empty as well (logged).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let snapshot = Self::load_document(&path);
        debug!(
            "Opened store document at {} ({} keys)",
            path.display(),
            snapshot.len()
        );
        Ok(Self {
            path,
            snapshot: Mutex::new(snapshot),
        })
    }

    /// The path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_document(path: &Path) -> HashMap<String, String> {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        "Store document at {} is corrupt, treating as empty: {}",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Could not read store document at {}: {}", path.display(), e);
                HashMap::new()
            }
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(entries).map_err(StoreError::Document)?;
        // Write-then-rename so readers never see a half-written document
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StoreBackend for FileBackend {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let document = Self::load_document(&self.path);
        let value = document.get(key).cloned();

        // A read refreshes this context's view of the key it touched, so
        // a later poll does not re-announce a value already adopted
        let mut snapshot = self.snapshot.lock()?;
        match &value {
            Some(raw) => {
                snapshot.insert(key.to_string(), raw.clone());
            }
            None => {
                snapshot.remove(key);
            }
        }
        Ok(value)
    }

    fn set_raw(&self, key: &str, raw: &str) -> Result<(), StoreError> {
        let mut snapshot = self.snapshot.lock()?;
        let mut document = Self::load_document(&self.path);
        document.insert(key.to_string(), raw.to_string());
        self.persist(&document)?;
        snapshot.insert(key.to_string(), raw.to_string());
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<(), StoreError> {
        let mut snapshot = self.snapshot.lock()?;
        let mut document = Self::load_document(&self.path);
        document.remove(key);
        self.persist(&document)?;
        snapshot.remove(key);
        Ok(())
    }

    fn poll_external(&self) -> Result<Vec<KeyChange>, StoreError> {
        let mut snapshot = self.snapshot.lock()?;
        let document = Self::load_document(&self.path);

        let mut changes = Vec::new();
        for (key, raw) in &document {
            if snapshot.get(key) != Some(raw) {
                changes.push(KeyChange {
                    key: key.clone(),
                    raw: Some(raw.clone()),
                });
            }
        }
        for key in snapshot.keys() {
            if !document.contains_key(key) {
                changes.push(KeyChange {
                    key: key.clone(),
                    raw: None,
                });
            }
        }
        changes.sort_by(|a, b| a.key.cmp(&b.key));

        *snapshot = document;
        Ok(changes)
    }
}
