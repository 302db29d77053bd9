// Everything that touches disk for a project lives under <project_dir>/.neonseq/
//   session.json  -- the last snapshot, written on quit and read on startup
//   store.json    -- small key/value store (control bindings live here)
//   config.json   -- see config.rs
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::StoreError;

pub const NEONSEQ_DIR: &str = ".neonseq";
const SESSION_FILE: &str = "session.json";
const STORE_FILE: &str = "store.json";

pub fn neonseq_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(NEONSEQ_DIR)
}

// <project_dir>/.neonseq/session.json
fn session_file_path(project_dir: &Path) -> PathBuf {
    neonseq_dir(project_dir).join(SESSION_FILE)
}

/// The raw snapshot text from the last save, if there is one.
pub fn load_session(project_dir: &Path) -> Option<String> {
    let path = session_file_path(project_dir);
    match std::fs::read_to_string(&path) {
        Ok(data) => Some(data),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!("could not read {}: {e}", path.display());
            None
        }
    }
}

// Save the snapshot text, creating .neonseq/ if it isn't there yet
pub fn save_session(project_dir: &Path, snapshot: &str) -> Result<(), StoreError> {
    let path = session_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, snapshot)?;
    debug!("session saved to {}", path.display());
    Ok(())
}

/// Small persistent string store, keyed by name.
pub trait BindingStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl BindingStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A JSON object on disk; every `set` rewrites the whole file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(project_dir: &Path) -> Self {
        let path = neonseq_dir(project_dir).join(STORE_FILE);
        let values = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!("{} is unreadable, starting empty: {e}", path.display());
                BTreeMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("could not read {}, starting empty: {e}", path.display());
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl BindingStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_session(dir.path()), None);
        save_session(dir.path(), "{\"version\":3}").unwrap();
        assert_eq!(load_session(dir.path()).as_deref(), Some("{\"version\":3}"));
        assert!(dir.path().join(".neonseq").is_dir());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path());
        store.set("a", "1").unwrap();
        store.set("b", "two").unwrap();

        let reopened = FileStore::open(dir.path());
        assert_eq!(reopened.get("a").as_deref(), Some("1"));
        assert_eq!(reopened.get("b").as_deref(), Some("two"));
        assert_eq!(reopened.get("c"), None);
    }

    #[test]
    fn garbage_store_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".neonseq")).unwrap();
        std::fs::write(dir.path().join(".neonseq/store.json"), "[[[").unwrap();
        let store = FileStore::open(dir.path());
        assert_eq!(store.get("anything"), None);
    }

    #[test]
    fn store_lives_under_the_project() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path());
        assert_eq!(store.path(), dir.path().join(".neonseq").join("store.json"));
    }

    #[test]
    fn unreadable_paths_are_skipped() {
        // directories where the files should be: reads fail with something
        // other than NotFound
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".neonseq/session.json")).unwrap();
        std::fs::create_dir_all(dir.path().join(".neonseq/store.json")).unwrap();
        assert_eq!(load_session(dir.path()), None);
        let store = FileStore::open(dir.path());
        assert_eq!(store.get("anything"), None);
    }
}
