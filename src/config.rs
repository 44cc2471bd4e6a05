use parking_lot::Mutex;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

pub(crate) const CONFIG_DIR: &str = "tidechat";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("base URL must not be empty")]
    EmptyBaseUrl,
    #[error("config dir unavailable")]
    NoConfigDir,
    #[error("failed to write config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Process-wide endpoint configuration: one base-URL string, mutable at
/// runtime through a settings save.
///
/// Reads never fail: an unset, unreadable or malformed config file degrades
/// to the hardcoded default. Writes update the in-memory value first so the
/// running session always observes the new endpoint even if persisting it
/// fails.
#[derive(Clone)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    base_url: Arc<Mutex<Option<String>>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        let path = dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE));
        Self::from_path(path)
    }

    /// Explicit file location, used by tests and by hosts that manage their
    /// own config dir.
    pub fn with_path(path: PathBuf) -> Self {
        Self::from_path(Some(path))
    }

    fn from_path(path: Option<PathBuf>) -> Self {
        let loaded = path.as_deref().and_then(read_base_url);
        Self {
            path,
            base_url: Arc::new(Mutex::new(loaded)),
        }
    }

    /// The configured base URL, or the default when unset. Trailing slashes
    /// are normalized away so path concatenation stays predictable.
    pub fn base_url(&self) -> String {
        let configured = self.base_url.lock().clone();
        let url = configured.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url.trim_end_matches('/').to_string()
    }

    pub fn is_default(&self) -> bool {
        self.base_url.lock().is_none()
    }

    pub fn set_base_url(&self, url: &str) -> Result<(), ConfigError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }

        {
            let mut guard = self.base_url.lock();
            *guard = Some(trimmed.to_string());
        }

        let path = self.path.as_ref().ok_or(ConfigError::NoConfigDir)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let cfg = json!({ "base_url": trimmed });
        std::fs::write(path, serde_json::to_string_pretty(&cfg)?)?;
        Ok(())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read_base_url(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
    let base = value.get("base_url")?.as_str()?.trim();
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}
