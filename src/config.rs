//! Application paths and persisted player settings.
//!
//! Directory priority:
//! 1. CLI `--config-dir`
//! 2. `TAPEDECK_CONFIG_DIR` environment variable
//! 3. Current folder IF `tapedeck.json` or `tapedeck.log` exists there
//! 4. Platform directory from dirs-next (`~/.config/tapedeck`, `%APPDATA%\tapedeck`, ...)

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::controls_timer::DEFAULT_HIDE_DELAY_MS;
use crate::core::speed::{REFERENCE_SPEEDS, SpeedTable};

pub const APP_NAME: &str = "tapedeck";
pub const SETTINGS_FILE: &str = "tapedeck.json";
pub const LOG_FILE: &str = "tapedeck.log";
pub const CONFIG_DIR_ENV: &str = "TAPEDECK_CONFIG_DIR";

/// Configuration for overriding default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI args → ENV var → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from));
        Self { config_dir }
    }
}

/// Path to a configuration file (settings)
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir()).join(name)
}

/// Path to a data file (logs)
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir()).join(name)
}

/// Create config and data directories if missing
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = resolve_dir(config, dirs_next::config_dir());
    let data_dir = resolve_dir(config, dirs_next::data_dir());

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    if data_dir != config_dir {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }
    Ok(())
}

fn has_local_config_files(dir: &Path) -> bool {
    [SETTINGS_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn resolve_dir(config: &PathConfig, platform_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Ok(current_dir) = std::env::current_dir()
        && has_local_config_files(&current_dir)
    {
        return current_dir;
    }
    platform_dir
        .map(|dir| dir.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Persisted player settings. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Idle time before the controls hide during playback
    pub controls_hide_ms: u64,
    /// Step for SeekForward/SeekBackward
    pub seek_step_ms: u64,
    pub speed_table: Vec<f64>,
    /// How often the engine reports position while playing
    pub status_interval_ms: u64,
    /// Start playing as soon as a freshly loaded source reports ready
    pub autoplay: bool,
    pub start_fullscreen: bool,
    /// Library side panel open
    pub show_library: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            controls_hide_ms: DEFAULT_HIDE_DELAY_MS,
            seek_step_ms: 10_000,
            speed_table: REFERENCE_SPEEDS.to_vec(),
            status_interval_ms: 250,
            autoplay: false,
            start_fullscreen: false,
            show_library: true,
        }
    }
}

impl PlayerSettings {
    /// Load from `path`; missing or unreadable files give defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => {
                info!("Settings loaded from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("Ignoring settings file: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Validated speed table; an invalid list falls back to the reference table.
    pub fn speed_table(&self) -> SpeedTable {
        SpeedTable::new(self.speed_table.clone()).unwrap_or_else(|| {
            warn!("Invalid speed table {:?}, using default", self.speed_table);
            SpeedTable::default()
        })
    }
}
