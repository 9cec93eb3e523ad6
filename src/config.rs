//! Tunable defaults, loaded best-effort from `upkeep.toml`
//!
//! The phase weights, soft totals and timeouts below approximate real-world
//! line counts of the wrapped tools. They are defaults, not contracts, and
//! can be overridden from the config file.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub ui: UiConfig,
    pub apply: ApplyConfig,
}

/// Health scan phase tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Relative weight of the app upgrade phase on the 0-100 scale
    pub app_weight: u32,
    /// Relative weight of the OS update phase
    pub update_weight: u32,
    /// Relative weight of the junk phase
    pub junk_weight: u32,
    /// Nominal line count of an app upgrade scan
    pub apps_soft_total: u64,
    /// Nominal line count of an OS update scan
    pub updates_soft_total: u64,
    pub apps_timeout_secs: u64,
    pub updates_timeout_secs: u64,
    /// Allows skipping the OS update phase even where the OS supports it
    pub updates_enabled: bool,
    /// Rolling log capacity during multi-phase scans
    pub log_lines: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            app_weight: 40,
            update_weight: 40,
            junk_weight: 20,
            apps_soft_total: 50,
            updates_soft_total: 40,
            apps_timeout_secs: 30,
            updates_timeout_secs: 40,
            updates_enabled: true,
            log_lines: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Rolling log capacity for standalone command runs
    pub log_lines: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { log_lines: 40 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    /// Install OS updates during Fix All. Off by default: update installs
    /// can force reboots, so they stay behind an explicit opt-in.
    pub install_os_updates: bool,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            install_os_updates: false,
        }
    }
}

impl Config {
    /// Load the config file if present and well-formed, defaults otherwise.
    /// A broken or missing file is not an error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "upkeep").map(|dirs| dirs.config_dir().join("upkeep.toml"))
    }

    pub fn apps_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.apps_timeout_secs)
    }

    pub fn updates_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.updates_timeout_secs)
    }
}
