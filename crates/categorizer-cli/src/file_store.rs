use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use categorizer_core::storage::{KeyValueStore, StorageError};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::debug;

/// Key-value store kept as one JSON object on disk. Every write replaces the
/// whole file through a temp file in the same directory.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(path))]
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        debug!(file = %path.display(), "opened file store");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self, key: &str) -> Result<Map<String, Value>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(StorageError::read(key, err)),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::decode(key, format!("{} is not a JSON object", self.path.display()))),
            Err(err) => Err(StorageError::decode(key, err)),
        }
    }

    fn write_all(&self, key: &str, map: &Map<String, Value>) -> Result<(), StorageError> {
        debug!(file = %self.path.display(), keys = map.len(), "saving file store atomically");

        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(|err| StorageError::write(key, err))?;
        serde_json::to_writer_pretty(&mut temp, map).map_err(|err| StorageError::write(key, err))?;
        writeln!(temp).map_err(|err| StorageError::write(key, err))?;
        temp.flush().map_err(|err| StorageError::write(key, err))?;
        temp.persist(&self.path)
            .map_err(|err| StorageError::write(key, err.error))?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.read_all(key)?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut map = self.read_all(key)?;
        map.insert(key.to_string(), value);
        self.write_all(key, &map)
    }
}
