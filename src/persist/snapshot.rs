use crate::core::error::PersistError;
use crate::models::session::SessionState;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persistence boundary for the session snapshot
pub trait SessionStore: Send + Sync {
    /// Read the last saved snapshot
    fn load(&self) -> Result<SessionState, PersistError>;

    /// Replace the saved snapshot
    fn save(&self, state: &SessionState) -> Result<(), PersistError>;
}

/// Stores the session as pretty-printed JSON.
///
/// Saves go to a sibling `.tmp` file which is synced and then renamed over
/// the target, so readers only ever see a complete snapshot.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self) -> Result<SessionState, PersistError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistError::Missing(self.path.clone()));
            }
            Err(e) => return Err(self.io_error(&self.path, e)),
        };

        Ok(serde_json::from_slice(&content)?)
    }

    fn save(&self, state: &SessionState) -> Result<(), PersistError> {
        let encoded = serde_json::to_vec_pretty(state)?;

        // One writer at a time so two saves never share the temp file
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(parent, e))?;
        }

        let temp_path = self.temp_path();
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| self.io_error(&temp_path, e))?;

        file.write_all(&encoded)
            .and_then(|_| file.write_all(b"\n"))
            .and_then(|_| file.sync_all())
            .map_err(|e| self.io_error(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(&self.path, e))
    }
}

/// In-memory store, mostly for tests
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Option<SessionState>>,
    fail_saves: Mutex<bool>,
    save_count: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already saved snapshot
    pub fn with_state(state: SessionState) -> Self {
        Self {
            saved: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    /// Last successfully saved snapshot
    pub fn saved(&self) -> Option<SessionState> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        *self.save_count.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<SessionState, PersistError> {
        self.saved()
            .ok_or_else(|| PersistError::Missing(PathBuf::from(":memory:")))
    }

    fn save(&self, state: &SessionState) -> Result<(), PersistError> {
        if *self.fail_saves.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(PersistError::Unavailable("saves disabled".to_string()));
        }
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        *self.save_count.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}
