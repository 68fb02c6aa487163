use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{non_empty, FetchError, JsonSource};
use crate::logging::ts_epoch_ms;

/// Fetches documents relative to a base URL with caching disabled.
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        let base = Url::parse(&normalized).with_context(|| format!("invalid base url {}", base))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Ok(Self { client, base })
    }

    pub fn url_for(&self, path: &str) -> Result<Url, FetchError> {
        let mut url = self.base.join(path).map_err(|e| FetchError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("_", &ts_epoch_ms().to_string());
        Ok(url)
    }
}

#[async_trait]
impl JsonSource for HttpSource {
    async fn fetch_json(&self, path: &str) -> Result<Value, FetchError> {
        let url = self.url_for(path)?;
        let resp = self
            .client
            .get(url)
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => {
                return Err(FetchError::NotFound { path: path.to_string() });
            }
            s if !s.is_success() => {
                return Err(FetchError::Status {
                    path: path.to_string(),
                    status: s.as_u16(),
                });
            }
            _ => {}
        }

        let value = resp.json::<Value>().await.map_err(|e| FetchError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        non_empty(path, value)
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }
}
