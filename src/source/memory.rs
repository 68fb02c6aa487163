use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{non_empty, FetchError, JsonSource};

/// In-process document store. Records every requested path in order.
#[derive(Default)]
pub struct MemorySource {
    docs: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, value: Value) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(path.into(), value);
        }
    }

    pub fn remove(&self, path: &str) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.remove(path);
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn clear_requests(&self) {
        if let Ok(mut r) = self.requests.lock() {
            r.clear();
        }
    }
}

#[async_trait]
impl JsonSource for MemorySource {
    async fn fetch_json(&self, path: &str) -> Result<Value, FetchError> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(path.to_string());
        }
        let found = self.docs.lock().ok().and_then(|docs| docs.get(path).cloned());
        match found {
            Some(value) => non_empty(path, value),
            None => Err(FetchError::NotFound { path: path.to_string() }),
        }
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
