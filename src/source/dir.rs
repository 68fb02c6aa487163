use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{non_empty, FetchError, JsonSource};

/// Reads documents from a dashboard directory on disk.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl JsonSource for DirSource {
    async fn fetch_json(&self, path: &str) -> Result<Value, FetchError> {
        let full = self.root.join(path);
        let bytes = tokio::fs::read(&full).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::NotFound { path: path.to_string() },
            _ => FetchError::Io { path: path.to_string(), source: e },
        })?;
        let value = serde_json::from_slice::<Value>(&bytes).map_err(|e| FetchError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        non_empty(path, value)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
