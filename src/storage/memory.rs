use super::{select, Snapshot, Store};
use async_trait::async_trait;
use crate::error::Result;
use tokio::sync::Mutex;

/// Store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Snapshot) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    pub async fn dump(&self) -> Snapshot {
        self.data.lock().await.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Snapshot> {
        let data = self.data.lock().await;
        Ok(select(&data, keys))
    }

    async fn set(&self, patch: Snapshot) -> Result<()> {
        let mut data = self.data.lock().await;
        data.extend(patch);
        Ok(())
    }
}
