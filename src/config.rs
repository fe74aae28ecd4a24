use anyhow::{bail, Result};
use std::time::Duration;

/// Index written to when `--index` is not given
pub const DEFAULT_INDEX_NAME: &str = "wikipedia_full";

pub const DEFAULT_HOST: &str = "localhost";

pub const DEFAULT_PORT: u16 = 9200;

/// Submissions between two cooldowns
pub const PACE_INTERVAL: u64 = 3000;

/// Length of each cooldown, in seconds
pub const PACE_COOLDOWN_SECS: u64 = 3;

/// Progress update interval (tick every N pages)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Checkpoint format version; bump when `Checkpoint` changes shape
pub const CHECKPOINT_VERSION: u32 = 1;

/// Pages between checkpoint saves
pub const CHECKPOINT_INTERVAL: u64 = 10_000;

/// Per-request timeout for the search store
pub const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    /// Basic auth needs both halves; a user without a password is rejected.
    pub fn from_args(user: Option<String>, password: Option<String>) -> Result<Option<Self>> {
        match (user, password) {
            (Some(user), Some(password)) => Ok(Some(Self { user, password })),
            (Some(user), None) => bail!("--user {user} was given without --password"),
            (None, Some(_)) => bail!("--password was given without --user"),
            (None, None) => Ok(None),
        }
    }
}

/// Where documents go. Built once before the run and never changed.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub index: String,
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            index: DEFAULT_INDEX_NAME.to_string(),
            credentials: None,
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }
}

impl StoreConfig {
    /// `http://host:port`, keeping any scheme already present on `host`.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}:{}", self.port)
        } else {
            format!("http://{host}:{}", self.port)
        }
    }
}

/// Fixed-window write throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub enabled: bool,
    pub interval: u64,
    pub cooldown: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: PACE_INTERVAL,
            cooldown: Duration::from_secs(PACE_COOLDOWN_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub input: String,
    pub mapping_path: String,
    pub store: StoreConfig,
    pub pacing: PacingConfig,
    pub limit: Option<u64>,
    pub resume: bool,
    /// Directory for `checkpoint.bin`; checkpointing is off when unset
    pub checkpoint_dir: Option<String>,
    pub checkpoint_interval: u64,
}
