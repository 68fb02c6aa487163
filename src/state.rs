use std::path::PathBuf;
use std::time::Duration;

use crate::model::Structure;
use crate::page::Page;
use crate::sequence::Sequencer;

pub const DEFAULT_POLL_SECS: u64 = 10;
pub const DEFAULT_FETCH_DELAY_MS: u64 = 100;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TITLE_PREFIX: &str = "Palantir";

#[derive(Clone, Debug)]
pub struct Config {
    /// Dashboard directory or base URL.
    pub source: String,
    pub poll_interval: Duration,
    /// Pause before every fetch is issued.
    pub fetch_delay: Duration,
    pub fetch_timeout: Duration,
    pub title_prefix: String,
    pub template_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: ".".to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            fetch_delay: Duration::from_millis(DEFAULT_FETCH_DELAY_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            title_prefix: DEFAULT_TITLE_PREFIX.to_string(),
            template_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            source: std::env::var("PALANTIR_SOURCE").unwrap_or_else(|_| ".".to_string()),
            poll_interval: Duration::from_secs(
                std::env::var("POLL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_POLL_SECS),
            ),
            fetch_delay: Duration::from_millis(
                std::env::var("FETCH_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_FETCH_DELAY_MS),
            ),
            fetch_timeout: Duration::from_secs(
                std::env::var("FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            ),
            title_prefix: std::env::var("TITLE_PREFIX").unwrap_or_else(|_| DEFAULT_TITLE_PREFIX.to_string()),
            template_dir: std::env::var("TEMPLATE_DIR").ok().map(PathBuf::from),
        }
    }

    /// No artificial delay, for tests and one-shot commands.
    pub fn immediate() -> Self {
        Self { fetch_delay: Duration::ZERO, ..Self::default() }
    }
}

/// Everything the sync loop remembers between fetches.
#[derive(Debug, Default)]
pub struct SyncState {
    /// Last structure whose skeleton was rendered.
    pub cache: Option<Structure>,
    pub page: Page,
    pub sequencer: Sequencer,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }
}
