use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

mod dir;
mod http;
mod memory;

pub use dir::DirSource;
pub use http::HttpSource;
pub use memory::MemorySource;

/// The single error kind of the sync loop: the document could not be
/// fetched or carried no data. Variants only refine the log message.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("document not found: {path}")]
    NotFound { path: String },

    #[error("request for {path} failed with status {status}")]
    Status { path: String, status: u16 },

    #[error("transport error for {path}: {message}")]
    Transport { path: String, message: String },

    #[error("document {path} is not valid JSON: {message}")]
    Decode { path: String, message: String },

    #[error("document {path} returned no data")]
    Empty { path: String },

    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn path(&self) -> &str {
        match self {
            FetchError::NotFound { path }
            | FetchError::Status { path, .. }
            | FetchError::Transport { path, .. }
            | FetchError::Decode { path, .. }
            | FetchError::Empty { path }
            | FetchError::Io { path, .. } => path,
        }
    }
}

/// Where dashboard documents come from. Paths are relative, e.g.
/// `data/structure.json`.
#[async_trait]
pub trait JsonSource: Send + Sync {
    async fn fetch_json(&self, path: &str) -> Result<Value, FetchError>;

    fn describe(&self) -> String;
}

/// A JSON `null` body counts as "no data".
pub(crate) fn non_empty(path: &str, value: Value) -> Result<Value, FetchError> {
    if value.is_null() {
        Err(FetchError::Empty { path: path.to_string() })
    } else {
        Ok(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Http,
    Dir,
}

impl SourceKind {
    pub fn detect(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            SourceKind::Http
        } else {
            SourceKind::Dir
        }
    }

    pub fn build(
        self,
        location: &str,
        timeout: Duration,
    ) -> anyhow::Result<Arc<dyn JsonSource>> {
        match self {
            SourceKind::Http => Ok(Arc::new(HttpSource::new(location, timeout)?)),
            SourceKind::Dir => Ok(Arc::new(DirSource::new(location))),
        }
    }
}
