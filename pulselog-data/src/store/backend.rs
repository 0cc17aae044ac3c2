use std::collections::HashMap;
use std::sync::Mutex;

use super::errors::StoreError;

/// A key that changed in the durable store outside this context, with the
/// new raw value (`None` when the key was removed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    /// The store key that changed
    pub key: String,

    /// The new raw serialized value, or `None` when the key was cleared
    pub raw: Option<String>,
}

/// Storage seam for the adapter: raw string values keyed by name, plus
/// detection of changes made by other contexts sharing the same store.
pub trait StoreBackend: Send + Sync {
    /// Fetch the raw serialized value for a key.
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Persist the raw serialized value for a key.
    fn set_raw(&self, key: &str, raw: &str) -> Result<(), StoreError>;

    /// Remove a key.
    fn remove_raw(&self, key: &str) -> Result<(), StoreError>;

    /// Report keys changed by other contexts since the last poll. Writes
    /// made through this backend instance are never reported.
    fn poll_external(&self) -> Result<Vec<KeyChange>, StoreError>;
}

/// In-memory backend. Private to one context, so it never observes
/// external changes.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock()?;
        Ok(entries.get(key).cloned())
    }

    fn set_raw(&self, key: &str, raw: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock()?;
        entries.insert(key.to_string(), raw.to_string());
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock()?;
        entries.remove(key);
        Ok(())
    }

    fn poll_external(&self) -> Result<Vec<KeyChange>, StoreError> {
        Ok(Vec::new())
    }
}

/// Mock backends for testing
#[cfg(any(test, feature = "mock"))]
pub mod tests {
    use super::*;

    /// Backend that rejects every write, for exercising degraded-persist
    /// paths. Reads pass through to an in-memory store seeded up front.
    #[derive(Debug, Default)]
    pub struct FailingBackend {
        inner: MemoryBackend,
    }

    impl FailingBackend {
        /// Create a new empty failing backend
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a failing backend with predefined raw entries
        pub fn with_entry(self, key: &str, raw: &str) -> Self {
            {
                let mut entries = self.inner.entries.lock().unwrap();
                entries.insert(key.to_string(), raw.to_string());
            }
            self
        }
    }

    impl StoreBackend for FailingBackend {
        fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get_raw(key)
        }

        fn set_raw(&self, _key: &str, _raw: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "write failed - mock is configured to reject writes",
            )))
        }

        fn remove_raw(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "remove failed - mock is configured to reject writes",
            )))
        }

        fn poll_external(&self) -> Result<Vec<KeyChange>, StoreError> {
            Ok(Vec::new())
        }
    }

    /// Backend whose external changes are scripted by the test
    #[derive(Debug, Default)]
    pub struct ScriptedBackend {
        inner: MemoryBackend,
        pending: Mutex<Vec<KeyChange>>,
    }

    impl ScriptedBackend {
        /// Create a new scripted backend
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue an external change for the next poll
        pub fn push_external(&self, key: &str, raw: Option<&str>) {
            let mut pending = self.pending.lock().unwrap();
            pending.push(KeyChange {
                key: key.to_string(),
                raw: raw.map(str::to_string),
            });
        }
    }

    impl StoreBackend for ScriptedBackend {
        fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get_raw(key)
        }

        fn set_raw(&self, key: &str, raw: &str) -> Result<(), StoreError> {
            self.inner.set_raw(key, raw)
        }

        fn remove_raw(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove_raw(key)
        }

        fn poll_external(&self) -> Result<Vec<KeyChange>, StoreError> {
            let mut pending = self.pending.lock()?;
            Ok(pending.drain(..).collect())
        }
    }

    #[test]
    fn test_memory_backend_round_trip() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get_raw("missing").unwrap(), None);

        backend.set_raw("key", "\"value\"").unwrap();
        assert_eq!(backend.get_raw("key").unwrap().as_deref(), Some("\"value\""));

        backend.remove_raw("key").unwrap();
        assert_eq!(backend.get_raw("key").unwrap(), None);
    }

    #[test]
    fn test_memory_backend_never_reports_external_changes() {
        let backend = MemoryBackend::new();
        backend.set_raw("key", "1").unwrap();
        assert!(backend.poll_external().unwrap().is_empty());
    }
}
