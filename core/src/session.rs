//! Persisted local state: the signed-in user and its bearer token.
//!
//! # Design
//! Storage is a plain string key-value store behind `KeyValueStore`, so the
//! host can back it with whatever the platform offers. Values are JSON with
//! no schema versioning. `Session` is the only reader/writer of the `user`
//! key; `ThemeStore` owns `prestataire_theme`.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const USER_KEY: &str = "user";
pub const THEME_KEY: &str = "prestataire_theme";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key-value storage that survives process restarts.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store. Used by tests and by FFI hosts that persist on their own.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// All keys in a single JSON object file, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Entries for a read-modify-write. Unparsable content reads as empty and
    /// sets the returned flag.
    fn read_for_update(&self) -> Result<(HashMap<String, String>, bool), StorageError> {
        match self.read_all() {
            Ok(entries) => Ok((entries, false)),
            Err(StorageError::Json(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "discarding corrupt store file"
                );
                Ok((HashMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    /// Replaces the file through a sibling temp file and a rename.
    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(entries)?.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut entries, _) = self.read_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut entries, discarded) = self.read_for_update()?;
        if entries.remove(key).is_some() || discarded {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// The persisted `user` record, as returned by `/user/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredUser {
    pub id: i64,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "filialeId")]
    pub filiale_id: Option<i64>,
    #[serde(default, rename = "prestataireId")]
    pub prestataire_id: Option<i64>,
    #[serde(default, rename = "prestataireLibelle")]
    pub prestataire_libelle: Option<String>,
}

impl StoredUser {
    pub fn display_name(&self) -> String {
        match (&self.prenom, &self.nom) {
            (Some(prenom), Some(nom)) => format!("{prenom} {nom}"),
            (None, Some(nom)) => nom.clone(),
            (Some(prenom), None) => prenom.clone(),
            (None, None) => self.login.clone(),
        }
    }
}

/// Handle on the persisted user, injected into the client and the screens.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    pub fn load_user(&self) -> Result<Option<StoredUser>, StorageError> {
        match self.store.get(USER_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// The stored user, or `None` when nothing is stored or storage fails.
    pub fn current_user(&self) -> Option<StoredUser> {
        match self.load_user() {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored user");
                None
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.current_user()
            .and_then(|u| u.token)
            .filter(|t| !t.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn save_user(&self, user: &StoredUser) -> Result<(), StorageError> {
        let raw = serde_json::to_string(user)?;
        self.store.set(USER_KEY, &raw)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(USER_KEY)
    }
}
