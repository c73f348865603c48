use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read state file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse state file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("state file '{path}' must contain a JSON object")]
    NotAnObject { path: PathBuf },
    #[error("failed to encode state: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write state file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub trait StateStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn write(&mut self, key: &str, value: Value) -> Result<(), StoreError>;

    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON object on disk. Every write rewrites the whole file atomically;
/// a missing file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject {
                path: self.path.clone(),
            }),
        }
    }

    fn save(&self, map: Map<String, Value>) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&Value::Object(map)).map_err(StoreError::Encode)?;
        self.replace_contents(text.as_bytes())
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }

    /// The new contents go to a temp file in the same directory, which is
    /// then renamed over the old file. Readers see either version, never a
    /// missing or partial file.
    fn replace_contents(&self, bytes: &[u8]) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|error| error.error)?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn write(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut map = self.load()?;
        map.insert(key.to_string(), value);
        self.save(map)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(map)?;
        }
        Ok(())
    }
}
