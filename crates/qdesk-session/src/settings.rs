//! Session settings and file locations

use anyhow::{Context, Result};
use qdesk_query::SlotOrdering;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("qdesk"))
}

pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .context("Could not determine data directory")
        .map(|p| p.join("qdesk"))
}

/// Default location of the persisted session
pub fn session_file() -> Result<PathBuf> {
    data_dir().map(|p| p.join("session.json"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub endpoint: EndpointSettings,
    pub tree: TreeSettings,
    pub query: QuerySettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

impl SessionSettings {
    /// Load settings from the default location, falling back to defaults
    /// when the file does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&content).with_context(|| "Failed to parse settings JSON")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn settings_path() -> Result<PathBuf> {
        config_dir().map(|p| p.join("settings.json"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// Base URL of the REST API, without trailing slash
    pub base_url: String,
    /// Per-request transport timeout; 0 disables it
    pub request_timeout_seconds: u64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8989/v1".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl EndpointSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_seconds > 0).then(|| Duration::from_secs(self.request_timeout_seconds))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    /// Every fetch (tree level or query slot) takes at least this long so
    /// loading indicators do not flicker; 0 disables the padding
    pub min_fetch_duration_ms: u64,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            min_fetch_duration_ms: 400,
        }
    }
}

impl TreeSettings {
    pub fn min_fetch_duration(&self) -> Duration {
        Duration::from_millis(self.min_fetch_duration_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub slot_ordering: SlotOrdering,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Where the session survives reloads; in memory only when unset
    pub session_file: Option<PathBuf>,
}

impl StorageSettings {
    /// Persist the session to the default file in the data dir
    pub fn in_data_dir() -> Result<Self> {
        Ok(Self {
            session_file: Some(session_file()?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
    pub console: bool,
    pub json_file: bool,
    /// Defaults to `logs/` in the data dir
    pub log_dir: Option<PathBuf>,
    pub span_events: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info,qdesk_connection=debug,qdesk_schema=debug,qdesk_query=debug,qdesk_session=debug"
                .to_string(),
            console: true,
            json_file: true,
            log_dir: None,
            span_events: false,
        }
    }
}
