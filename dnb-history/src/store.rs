use crate::calendar::{format_iso8601, now_ms};
use crate::settings::Settings;
use anyhow::{Context, Result};
use dnb_core::{SessionResult, SessionStore, StoredSession};
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use uuid::Uuid;

const SESSIONS_FILE: &str = "sessions.json";
const SETTINGS_FILE: &str = "settings.json";

/// Read side and maintenance of a session store
pub trait HistoryStore: SessionStore {
    /// All sessions, oldest first
    fn sessions(&self) -> Result<Vec<StoredSession>>;
    /// Returns whether a session with `id` existed
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn clear_sessions(&self) -> Result<()>;
    /// Merges `sessions` into the history, keeping timestamp order
    fn import_sessions(&self, sessions: Vec<StoredSession>) -> Result<()>;
}

/// Assigns an id and timestamp to a finished session
pub fn stamp(result: &SessionResult, timestamp_ms: u64) -> StoredSession {
    StoredSession {
        id: Uuid::new_v4().to_string(),
        timestamp_ms,
        date: format_iso8601(timestamp_ms),
        result: result.clone(),
    }
}

fn merge(into: &mut Vec<StoredSession>, sessions: Vec<StoredSession>) {
    into.extend(sessions);
    into.sort_by_key(|s| s.timestamp_ms);
}

/// History kept as JSON files in a directory
pub struct JsonStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create data directory {}", dir.display()))?;
        debug!("History store at {}", dir.display());
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings(&self) -> Result<Settings> {
        let _guard = self.guard();
        Ok(self.read_or_default(SETTINGS_FILE))
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let _guard = self.guard();
        self.write(SETTINGS_FILE, settings)
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A missing or unreadable file reads as the default value
    fn read_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.dir.join(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(_) => return T::default(),
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!("Ignoring corrupt {}: {e}", path.display());
            T::default()
        })
    }

    /// Writes a sibling temp file and renames it over `name`, so a failed
    /// write leaves the previous contents in place
    fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("cannot create temp file in {}", self.dir.display()))?;
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)
            .with_context(|| format!("cannot write {}", path.display()))?;
        writer.flush()?;
        drop(writer);
        tmp.persist(&path)
            .with_context(|| format!("cannot replace {}", path.display()))?;
        Ok(())
    }

    fn load_sessions(&self) -> Vec<StoredSession> {
        self.read_or_default(SESSIONS_FILE)
    }

    /// Sessions to be rewritten. A file that exists but does not parse is an
    /// error, never an empty history.
    fn load_sessions_for_update(&self) -> Result<Vec<StoredSession>> {
        let path = self.dir.join(SESSIONS_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("cannot read {}", path.display())),
        };
        serde_json::from_slice(&bytes).with_context(|| {
            format!("{} is corrupt; refusing to overwrite it", path.display())
        })
    }
}

impl SessionStore for JsonStore {
    fn save_session(&self, result: &SessionResult) -> Result<StoredSession> {
        let _guard = self.guard();
        let mut sessions = self.load_sessions_for_update()?;
        let stored = stamp(result, now_ms());
        sessions.push(stored.clone());
        self.write(SESSIONS_FILE, &sessions)?;
        debug!("Stored session {} ({} total)", stored.id, sessions.len());
        Ok(stored)
    }
}

impl HistoryStore for JsonStore {
    fn sessions(&self) -> Result<Vec<StoredSession>> {
        let _guard = self.guard();
        Ok(self.load_sessions())
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let _guard = self.guard();
        let mut sessions = self.load_sessions_for_update()?;
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        if sessions.len() == before {
            return Ok(false);
        }
        self.write(SESSIONS_FILE, &sessions)?;
        Ok(true)
    }

    fn clear_sessions(&self) -> Result<()> {
        let _guard = self.guard();
        let path = self.dir.join(SESSIONS_FILE);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("cannot remove {}", path.display())),
        }
    }

    fn import_sessions(&self, sessions: Vec<StoredSession>) -> Result<()> {
        let _guard = self.guard();
        let mut all = self.load_sessions_for_update()?;
        merge(&mut all, sessions);
        self.write(SESSIONS_FILE, &all)
    }
}

/// History held in memory only
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<Vec<StoredSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemoryStore {
    fn save_session(&self, result: &SessionResult) -> Result<StoredSession> {
        let stored = stamp(result, now_ms());
        self.lock().push(stored.clone());
        Ok(stored)
    }
}

impl HistoryStore for MemoryStore {
    fn sessions(&self) -> Result<Vec<StoredSession>> {
        Ok(self.lock().clone())
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        Ok(sessions.len() != before)
    }

    fn clear_sessions(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }

    fn import_sessions(&self, sessions: Vec<StoredSession>) -> Result<()> {
        merge(&mut self.lock(), sessions);
        Ok(())
    }
}
