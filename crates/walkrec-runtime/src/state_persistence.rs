//! Session persistence across reloads.
//!
//! The recorder persists a projection of its store (actions, interned
//! states, and the recording flag) under a single key. Live node handles and
//! archived walkthroughs are never written; a restored session starts with
//! an empty ref registry.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       SessionStore                            │
//! │   - Projects StoreState into a PersistedSession               │
//! │   - Skips the write when the projection is unchanged          │
//! │   - Restores with silent fallback to the empty state          │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     StorageBackend                            │
//! │   - MemoryStorage: in-memory (testing, ephemeral)             │
//! │   - FileStorage: JSON file (requires state-persistence)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Save logged, session continues |
//! | `StorageError::Serialization` | JSON encode/decode | Restore falls back to empty state |
//! | `StorageError::Corruption` | Invalid file format or poisoned lock | Restore falls back to empty state |
//! | Schema mismatch | Stored by an incompatible version | Ignored, empty state |
//!
//! # Feature Gates
//!
//! - `state-persistence`: Enables `FileStorage` with a base64 JSON envelope.
//!   Without this feature, only `MemoryStorage` is available.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use walkrec_widgets::{GuiState, StateTable};

use crate::action::Action;
use crate::store::StoreState;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during session storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations.
    Io(std::io::Error),
    /// Serialization or deserialization error.
    Serialization(String),
    /// Stored data is corrupted or in an invalid format.
    Corruption(String),
    /// Backend is not available.
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            StorageError::Corruption(msg) => write!(f, "storage corruption: {msg}"),
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ─────────────────────────────────────────────────────────────────────────────
// Storage Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A serialized value with version metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    /// Schema version of `data`.
    pub version: u32,
    /// Serialized payload (JSON bytes).
    pub data: Vec<u8>,
}

/// Key-value storage for serialized sessions.
///
/// Implementations must be `Send + Sync`; the recorder saves from whichever
/// thread drains its dispatch queue.
pub trait StorageBackend: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Load the entry stored under `key`, or `None` on first run.
    fn load(&self, key: &str) -> StorageResult<Option<StoredEntry>>;

    /// Store `entry`, replacing any previous value under its key.
    fn save(&self, entry: &StoredEntry) -> StorageResult<()>;

    /// Remove the entry stored under `key`, if any.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Check if the backend is available and functional.
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn load(&self, key: &str) -> StorageResult<Option<StoredEntry>> {
        (**self).load(key)
    }

    fn save(&self, entry: &StoredEntry) -> StorageResult<()> {
        (**self).save(entry)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Storage (always available)
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory storage backend. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory storage pre-populated with entries.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = StoredEntry>) -> Self {
        Self {
            data: RwLock::new(entries.into_iter().map(|e| (e.key.clone(), e)).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn load(&self, key: &str) -> StorageResult<Option<StoredEntry>> {
        let guard = self
            .data
            .read()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn save(&self, entry: &StoredEntry) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.remove(key);
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries", &self.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Storage (requires state-persistence feature)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "state-persistence")]
mod file_storage {
    use super::*;
    use base64::Engine;
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};

    #[derive(Serialize, Deserialize)]
    struct StateFile {
        format_version: u32,
        entries: HashMap<String, FileEntry>,
    }

    #[derive(Serialize, Deserialize)]
    struct FileEntry {
        version: u32,
        data_base64: String,
    }

    impl StateFile {
        const FORMAT_VERSION: u32 = 1;

        fn new() -> Self {
            Self {
                format_version: Self::FORMAT_VERSION,
                entries: HashMap::new(),
            }
        }
    }

    /// JSON file storage.
    ///
    /// ```json
    /// {
    ///   "format_version": 1,
    ///   "entries": {
    ///     "WALKREC_STATE": { "version": 1, "data_base64": "eyJhY3Rpb25zIjpbXX0=" }
    ///   }
    /// }
    /// ```
    ///
    /// Writes go to `{path}.tmp` and are renamed over `{path}`, so a crash
    /// mid-write leaves the previous file intact.
    pub struct FileStorage {
        path: PathBuf,
    }

    impl FileStorage {
        /// The file is created on first save.
        #[must_use]
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
            }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn temp_path(&self) -> PathBuf {
            let mut tmp = self.path.clone();
            tmp.set_extension("json.tmp");
            tmp
        }

        fn read_file(&self) -> StorageResult<StateFile> {
            if !self.path.exists() {
                return Ok(StateFile::new());
            }
            let reader = BufReader::new(File::open(&self.path)?);
            let file: StateFile = serde_json::from_reader(reader)
                .map_err(|e| StorageError::Serialization(format!("failed to parse state file: {e}")))?;
            if file.format_version != StateFile::FORMAT_VERSION {
                warn!(
                    stored = file.format_version,
                    expected = StateFile::FORMAT_VERSION,
                    "state file format version mismatch, ignoring stored sessions"
                );
                return Ok(StateFile::new());
            }
            Ok(file)
        }

        /// Existing contents for a read-modify-write; an unreadable file is
        /// replaced rather than blocking the save.
        fn read_for_update(&self) -> StateFile {
            self.read_file().unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "replacing unreadable state file");
                StateFile::new()
            })
        }

        fn write_file(&self, file: &StateFile) -> StorageResult<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let tmp_path = self.temp_path();
            {
                let mut writer = BufWriter::new(File::create(&tmp_path)?);
                serde_json::to_writer_pretty(&mut writer, file)
                    .map_err(|e| StorageError::Serialization(format!("failed to serialize state: {e}")))?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }
            fs::rename(&tmp_path, &self.path)?;
            Ok(())
        }
    }

    impl StorageBackend for FileStorage {
        fn name(&self) -> &str {
            "FileStorage"
        }

        fn load(&self, key: &str) -> StorageResult<Option<StoredEntry>> {
            let mut file = self.read_file()?;
            let Some(entry) = file.entries.remove(key) else {
                return Ok(None);
            };
            let data = base64::engine::general_purpose::STANDARD
                .decode(&entry.data_base64)
                .map_err(|e| StorageError::Corruption(format!("bad payload for {key}: {e}")))?;
            Ok(Some(StoredEntry {
                key: key.to_string(),
                version: entry.version,
                data,
            }))
        }

        fn save(&self, entry: &StoredEntry) -> StorageResult<()> {
            let mut file = self.read_for_update();
            file.entries.insert(
                entry.key.clone(),
                FileEntry {
                    version: entry.version,
                    data_base64: base64::engine::general_purpose::STANDARD.encode(&entry.data),
                },
            );
            self.write_file(&file)?;
            debug!(path = %self.path.display(), key = %entry.key, bytes = entry.data.len(), "saved session");
            Ok(())
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            if !self.path.exists() {
                return Ok(());
            }
            let mut file = self.read_for_update();
            if file.entries.remove(key).is_some() {
                self.write_file(&file)?;
            }
            Ok(())
        }

        fn is_available(&self) -> bool {
            let Some(parent) = self.path.parent() else {
                return false;
            };
            if !parent.exists() {
                return fs::create_dir_all(parent).is_ok();
            }
            let probe = parent.join(".walkrec_write_probe");
            if fs::write(&probe, b"probe").is_ok() {
                let _ = fs::remove_file(&probe);
                return true;
            }
            false
        }
    }

    impl fmt::Debug for FileStorage {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("FileStorage")
                .field("path", &self.path)
                .finish()
        }
    }
}

#[cfg(feature = "state-persistence")]
pub use file_storage::FileStorage;

// ─────────────────────────────────────────────────────────────────────────────
// Persisted Session
// ─────────────────────────────────────────────────────────────────────────────

/// Schema version written with every session.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// The persisted projection of the store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub schema_version: u32,
    pub actions: Vec<Action>,
    pub gui_states: Vec<GuiState>,
    pub walkthrough_active: bool,
}

impl PersistedSession {
    #[must_use]
    pub fn from_state(state: &StoreState) -> Self {
        Self {
            schema_version: SESSION_SCHEMA_VERSION,
            actions: state.actions.iter().cloned().collect(),
            gui_states: state.gui_states.to_vec(),
            walkthrough_active: state.walkthrough_active,
        }
    }

    /// Rebuild a store. Refs and archived walkthroughs start empty.
    #[must_use]
    pub fn into_state(self) -> StoreState {
        StoreState {
            actions: self.actions.into_iter().collect(),
            gui_states: StateTable::from_states(self.gui_states),
            walkthrough_active: self.walkthrough_active,
            ..StoreState::default()
        }
    }

    pub fn to_entry(&self, key: &str) -> StorageResult<StoredEntry> {
        Ok(StoredEntry {
            key: key.to_string(),
            version: self.schema_version,
            data: serde_json::to_vec(self)?,
        })
    }

    pub fn from_entry(entry: &StoredEntry) -> StorageResult<Self> {
        if entry.version != SESSION_SCHEMA_VERSION {
            return Err(StorageError::Corruption(format!(
                "session schema {} (expected {SESSION_SCHEMA_VERSION})",
                entry.version
            )));
        }
        Ok(serde_json::from_slice(&entry.data)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Store
// ─────────────────────────────────────────────────────────────────────────────

/// Saves and restores the recorder's session under one key.
pub struct SessionStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
    last_saved: Mutex<Option<PersistedSession>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            last_saved: Mutex::new(None),
        }
    }

    /// Ephemeral store for tests.
    #[must_use]
    pub fn in_memory(key: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), key)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Load the stored session.
    pub fn load(&self) -> StorageResult<Option<PersistedSession>> {
        match self.backend.load(&self.key)? {
            Some(entry) => PersistedSession::from_entry(&entry).map(Some),
            None => Ok(None),
        }
    }

    /// Restore the store, falling back to the empty state on any failure.
    pub fn restore(&self) -> StoreState {
        match self.load() {
            Ok(Some(session)) => {
                debug!(
                    backend = self.backend.name(),
                    actions = session.actions.len(),
                    states = session.gui_states.len(),
                    "restored session"
                );
                self.remember(session.clone());
                session.into_state()
            }
            Ok(None) => StoreState::default(),
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "discarding unreadable session");
                StoreState::default()
            }
        }
    }

    /// Persist `state` if its projection changed since the last save.
    ///
    /// Returns `Ok(true)` if data was written.
    pub fn persist(&self, state: &StoreState) -> StorageResult<bool> {
        let session = PersistedSession::from_state(state);
        let mut last = self
            .last_saved
            .lock()
            .map_err(|_| StorageError::Corruption("session lock poisoned".into()))?;
        if last.as_ref() == Some(&session) {
            return Ok(false);
        }
        self.backend.save(&session.to_entry(&self.key)?)?;
        debug!(
            backend = self.backend.name(),
            actions = session.actions.len(),
            active = session.walkthrough_active,
            "persisted session"
        );
        *last = Some(session);
        Ok(true)
    }

    /// Remove the stored session.
    pub fn clear(&self) -> StorageResult<()> {
        self.backend.remove(&self.key)?;
        if let Ok(mut last) = self.last_saved.lock() {
            *last = None;
        }
        Ok(())
    }

    fn remember(&self, session: PersistedSession) {
        if let Ok(mut last) = self.last_saved.lock() {
            *last = Some(session);
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .finish()
    }
}
