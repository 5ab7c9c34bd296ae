//! Typed access to the process-wide keyed store.
//!
//! Entries are schema-free JSON documents persisted under fixed keys. Every
//! read goes through a [`StoreKey`] that owns parsing and defaulting, so an
//! absent entry (first run) or a malformed one yields the key's default
//! instead of an error. Writes happen only on explicit [`LocalStore::set`];
//! concurrent writers are not coordinated and the last write wins.

mod entries;

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use entries::{
    HomeContent, MayorData, PersonalityProposal, HOME_CONTENT, KNOWN_KEYS, MAYOR_DATA,
    PERSONALITY_LIKES, PERSONALITY_PROPOSALS,
};

use crate::{Error, Result};

/// Raw string storage behind a [`LocalStore`].
pub trait StoreBackend: Send + Sync {
    fn read_raw(&self, key: &str) -> Result<Option<String>>;
    fn write_raw(&self, key: &str, value: &str) -> Result<()>;
    fn remove_raw(&self, key: &str) -> Result<()>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        if !valid {
            return Err(Error::InvalidInput(format!("invalid store key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl StoreBackend for FileBackend {
    fn read_raw(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(path, value)?;
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StoreBackend for MemoryBackend {
    fn read_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// A named entry holding a `T`.
pub struct StoreKey<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> StoreKey<T> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for StoreKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StoreKey<T> {}

impl<T> std::fmt::Debug for StoreKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StoreKey").field(&self.name).finish()
    }
}

#[derive(Debug)]
pub struct LocalStore<B: StoreBackend> {
    backend: B,
}

impl LocalStore<FileBackend> {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(dir))
    }
}

impl LocalStore<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::default())
    }
}

impl<B: StoreBackend> LocalStore<B> {
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Read `key`, falling back to `T::default()` when absent or malformed.
    pub fn get<T>(&self, key: StoreKey<T>) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.get_or(key, T::default())
    }

    /// Read `key`, falling back to `default` when absent or malformed.
    pub fn get_or<T: DeserializeOwned>(&self, key: StoreKey<T>, default: T) -> T {
        self.try_get(key).unwrap_or_else(|| {
            tracing::debug!(key = key.name(), "Using default for local entry");
            default
        })
    }

    /// Read `key`; `None` when absent, unreadable or malformed.
    pub fn try_get<T: DeserializeOwned>(&self, key: StoreKey<T>) -> Option<T> {
        let raw = match self.backend.read_raw(key.name()) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!(key = key.name(), "Failed to read local entry: {}", error);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(key = key.name(), "Ignoring malformed local entry: {}", error);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: StoreKey<T>, value: &T) -> Result<()> {
        let raw = serde_json::to_string_pretty(value)?;
        self.backend.write_raw(key.name(), &raw)?;
        tracing::debug!(key = key.name(), "Saved local entry");
        Ok(())
    }

    pub fn remove<T>(&self, key: StoreKey<T>) -> Result<()> {
        self.backend.remove_raw(key.name())
    }

    /// Raw text of an entry by name, for inspection tools.
    pub fn raw(&self, name: &str) -> Result<Option<String>> {
        self.backend.read_raw(name)
    }

    pub fn remove_named(&self, name: &str) -> Result<()> {
        self.backend.remove_raw(name)
    }
}
