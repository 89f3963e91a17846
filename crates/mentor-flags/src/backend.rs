//! Storage backends
//!
//! A backend is a flat map of flag name to serialized value. Three are
//! provided: [`FileBackend`] persists to one JSON file, [`MemoryBackend`]
//! lives for the process, and [`UnavailableBackend`] fails every call the
//! way blocked browser storage does.

use crate::error::{FlagError, FlagResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Raw key/value storage behind a [`FlagStore`](crate::FlagStore)
pub trait StorageBackend: Send + Sync + Debug {
    /// Read the raw value of `name`
    fn read(&self, name: &str) -> FlagResult<Option<String>>;

    /// Store the raw value of `name`
    fn write(&self, name: &str, value: &str) -> FlagResult<()>;

    /// Delete `name`; absent names are not an error
    fn delete(&self, name: &str) -> FlagResult<()>;

    /// Delete every flag
    fn clear(&self) -> FlagResult<()>;

    /// Every stored name with its raw value, sorted by name
    fn entries(&self) -> FlagResult<Vec<(String, String)>>;

    /// Short backend name for logs
    fn kind(&self) -> &'static str;
}

/// Process-lifetime backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryBackend {
    /// Empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, name: &str) -> FlagResult<Option<String>> {
        Ok(self.values.read().get(name).cloned())
    }

    fn write(&self, name: &str, value: &str) -> FlagResult<()> {
        self.values.write().insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, name: &str) -> FlagResult<()> {
        self.values.write().remove(name);
        Ok(())
    }

    fn clear(&self) -> FlagResult<()> {
        self.values.write().clear();
        Ok(())
    }

    fn entries(&self) -> FlagResult<Vec<(String, String)>> {
        Ok(self
            .values
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

/// Backend persisted as a JSON object in one file
///
/// The file is read once on open; every write rewrites it through a
/// temporary file and a rename.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileBackend {
    /// Open the store at `path`, creating nothing until the first write
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> FlagResult<Self> {
        let path = path.into();
        let values = Self::load(&path)?;
        debug!(path = %path.display(), flags = values.len(), "opened flag file");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> FlagResult<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(path).map_err(|e| FlagError::io(path, e))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| FlagError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn save(&self, values: &BTreeMap<String, String>) -> FlagResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FlagError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(values).map_err(|e| FlagError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, json).map_err(|e| FlagError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| FlagError::io(&self.path, e))
    }

    fn update<F>(&self, change: F) -> FlagResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut values = self.values.write();
        let mut next = values.clone();
        change(&mut next);
        self.save(&next)?;
        *values = next;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, name: &str) -> FlagResult<Option<String>> {
        Ok(self.values.read().get(name).cloned())
    }

    fn write(&self, name: &str, value: &str) -> FlagResult<()> {
        self.update(|values| {
            values.insert(name.to_string(), value.to_string());
        })
    }

    fn delete(&self, name: &str) -> FlagResult<()> {
        if !self.values.read().contains_key(name) {
            return Ok(());
        }
        self.update(|values| {
            values.remove(name);
        })
    }

    fn clear(&self) -> FlagResult<()> {
        self.update(BTreeMap::clear)
    }

    fn entries(&self) -> FlagResult<Vec<(String, String)>> {
        Ok(self
            .values
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}

/// Backend that rejects every call
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    /// Backend failing with `reason`
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> FlagResult<T> {
        Err(FlagError::Unavailable(self.reason.clone()))
    }
}

impl Default for UnavailableBackend {
    fn default() -> Self {
        Self::new("storage is disabled")
    }
}

impl StorageBackend for UnavailableBackend {
    fn read(&self, _name: &str) -> FlagResult<Option<String>> {
        self.fail()
    }

    fn write(&self, _name: &str, _value: &str) -> FlagResult<()> {
        self.fail()
    }

    fn delete(&self, _name: &str) -> FlagResult<()> {
        self.fail()
    }

    fn clear(&self) -> FlagResult<()> {
        self.fail()
    }

    fn entries(&self) -> FlagResult<Vec<(String, String)>> {
        self.fail()
    }

    fn kind(&self) -> &'static str {
        "unavailable"
    }
}
