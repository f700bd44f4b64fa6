//! Client settings: a small JSON file under the XDG config dir,
//! $XDG_CONFIG_HOME/syspulse/settings.json (fallback ~/.config/syspulse/settings.json).
//!
//! The stored `alerts` block is the last-known-good alert configuration, used
//! whenever the backend cannot be asked for the current one.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};
use thiserror::Error;

use crate::alerts::DEFAULT_CRITICAL_MARGIN;
use crate::connection::Backoff;
use crate::history::DEFAULT_CAPACITY;
use crate::types::AlertConfig;

pub const DEFAULT_URL: &str = "ws://127.0.0.1:8080/ws";
pub const URL_ENV: &str = "SYSPULSE_URL";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconnectSettings {
    pub step_ms: u64,
    pub cap_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        let b = Backoff::default();
        Self {
            step_ms: b.step.as_millis() as u64,
            cap_ms: b.cap.as_millis() as u64,
            max_attempts: b.max_attempts,
        }
    }
}

impl ReconnectSettings {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            step: Duration::from_millis(self.step_ms),
            cap: Duration::from_millis(self.cap_ms.max(self.step_ms)),
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub url: String,
    pub history_capacity: usize,
    pub reconnect: ReconnectSettings,
    pub critical_margin: f64,
    pub sound: bool,
    pub alerts: AlertConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            history_capacity: DEFAULT_CAPACITY,
            reconnect: ReconnectSettings::default(),
            critical_margin: DEFAULT_CRITICAL_MARGIN,
            sound: true,
            alerts: AlertConfig::default(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("syspulse")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("syspulse")
    }
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn log_path() -> PathBuf {
    config_dir().join("syspulse.log")
}

/// Missing or unreadable files yield defaults; a corrupt file is logged and
/// ignored.
pub fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "ignoring corrupt settings: {e}");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}

pub fn save_settings(path: &Path, s: &Settings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(path, data).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Runtime overrides layered over the stored file, lowest to highest:
/// file, `SYSPULSE_URL`, command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub url: Option<String>,
    pub env_url: Option<String>,
    pub history_capacity: Option<usize>,
    pub mute: bool,
}

impl Overrides {
    pub fn apply(self, mut s: Settings) -> Settings {
        if let Some(u) = self.env_url.filter(|u| !u.trim().is_empty()) {
            s.url = u;
        }
        if let Some(u) = self.url {
            s.url = u;
        }
        if let Some(n) = self.history_capacity {
            s.history_capacity = n.max(1);
        }
        if self.mute {
            s.sound = false;
        }
        s
    }
}
