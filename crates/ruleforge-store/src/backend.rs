//! Durable backends for store snapshots
//!
//! The store encodes its state itself; a backend only keeps the bytes.
//! Any medium that returns exactly what it was last given satisfies the
//! contract.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Errors raised by a backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Trait for places a store snapshot can be written to and read back from
pub trait StoreBackend: Send + Sync {
    /// Get the backend name (e.g., "json-file", "memory")
    fn name(&self) -> &'static str;

    /// Replace the stored snapshot
    fn save(&self, bytes: &[u8]) -> Result<(), BackendError>;

    /// Read the stored snapshot, `None` when nothing was saved yet
    fn load(&self) -> Result<Option<Vec<u8>>, BackendError>;
}

/// Snapshot kept in a single JSON file
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> BackendError {
        BackendError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StoreBackend for JsonFileBackend {
    fn name(&self) -> &'static str {
        "json-file"
    }

    fn save(&self, bytes: &[u8]) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let temp = self.temp_path();
        std::fs::write(&temp, bytes).map_err(|e| self.io_error(e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<u8>>, BackendError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-memory backend for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryBackend {
    bytes: Mutex<Option<Vec<u8>>>,

    /// Simulate an unavailable medium
    fail: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every save and load fail
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// The last saved snapshot
    pub fn contents(&self) -> Option<Vec<u8>> {
        match self.bytes.lock() {
            Ok(guard) => (*guard).clone(),
            Err(poisoned) => (*poisoned.into_inner()).clone(),
        }
    }

    /// Overwrite the stored bytes directly
    pub fn set_contents(&self, bytes: Vec<u8>) {
        match self.bytes.lock() {
            Ok(mut guard) => *guard = Some(bytes),
            Err(poisoned) => *poisoned.into_inner() = Some(bytes),
        }
    }
}

impl StoreBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn save(&self, bytes: &[u8]) -> Result<(), BackendError> {
        if self.fail {
            return Err(BackendError::Unavailable("simulated failure".to_string()));
        }
        self.set_contents(bytes.to_vec());
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<u8>>, BackendError> {
        if self.fail {
            return Err(BackendError::Unavailable("simulated failure".to_string()));
        }
        Ok(self.contents())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backend_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("state.json"));
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn file_backend_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nested/.ruleforge/state.json"));

        backend.save(b"{}").unwrap();
        assert_eq!(backend.load().unwrap().as_deref(), Some(&b"{}"[..]));
        assert!(!dir.path().join("nested/.ruleforge/state.json.tmp").exists());
    }

    #[test]
    fn memory_backend_failure() {
        let backend = MemoryBackend::new().with_failure();
        assert!(backend.save(b"x").is_err());
        assert!(backend.load().is_err());
    }
}
