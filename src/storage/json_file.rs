use super::{select, Snapshot, Store};
use crate::error::{ExportError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tokio::task;

/// Store persisted as one JSON object on disk.
///
/// The file is loaded on first access and rewritten in full on every `set`
/// via a temporary file in the same directory, so a crash never leaves a
/// half-written store behind.
pub struct JsonFileStore {
    path: PathBuf,
    cache: Mutex<Option<Snapshot>>,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Snapshot> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::new()),
            Err(e) => return Err(ExportError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(Snapshot::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ExportError::Storage {
                message: format!("{} does not contain a JSON object", self.path.display()),
            }),
            Err(e) => Err(ExportError::Storage {
                message: format!("failed to parse {}: {}", self.path.display(), e),
            }),
        }
    }

    async fn persist(&self, data: &Snapshot) -> Result<()> {
        let path = self.path.clone();
        let content = serde_json::to_vec_pretty(data)?;

        task::spawn_blocking(move || write_atomically(&path, &content))
            .await
            .map_err(|e| ExportError::Storage {
                message: format!("store write task failed: {}", e),
            })?
    }
}

fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory)?;

    let mut temp = tempfile::NamedTempFile::new_in(&directory)?;
    temp.write_all(content)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| ExportError::Io(e.error))?;

    Ok(())
}

#[async_trait]
impl Store for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> Result<Snapshot> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load().await?);
        }
        Ok(cache.as_ref().map(|data| select(data, keys)).unwrap_or_default())
    }

    async fn set(&self, patch: Snapshot) -> Result<()> {
        let mut cache = self.cache.lock().await;
        let mut data = match cache.take() {
            Some(data) => data,
            None => self.load().await?,
        };
        data.extend(patch);

        let written = self.persist(&data).await;
        *cache = Some(data);
        written
    }
}
