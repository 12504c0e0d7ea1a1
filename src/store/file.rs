use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use super::KvStore;
use crate::error::FetchError;

/// Treats files under a root directory as keys.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key.trim_start_matches('/'))
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FetchError::KeyNotFound(key.to_string())),
            Err(e) => Err(FetchError::Io(e)),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
