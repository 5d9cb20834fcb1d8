//=====================================================
// File: config.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runtime configuration for the LumaScript machine
// Objective: TOML file with defaults for every field, located under the
//            user's config directory unless a path is given
//=====================================================

//! Configuration handling including loading and defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::vm::codes::UnitMode;

/// Directory under the user's config directory.
const CONFIG_DIR: &str = "lumascript";
/// File name inside [`CONFIG_DIR`].
const CONFIG_FILE: &str = "config.toml";
/// Overrides `log_level` when set.
pub const LOG_ENV: &str = "LUMASCRIPT_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VmConfig {
    /// Upper bound for one blocking discovery pass.
    pub discovery_timeout_ms: u64,
    /// Deepest call stack a program may build.
    pub max_frames: usize,
    /// OUT text is flushed once the line buffer grows past this many bytes.
    pub max_print_buffer: usize,
    /// Warn when a value has to be clamped on its way to a device.
    pub clamp_raw_values: bool,
    /// PAUSE waits for a key only when this is set.
    pub enable_pause: bool,
    /// Emit one debug event per executed instruction.
    pub trace_instructions: bool,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Unit mode the register file starts each run in.
    pub default_unit_mode: UnitMode,
    /// Number of simulated lights the CLI creates.
    pub fake_lights: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_ms: 5_000,
            max_frames: 256,
            max_print_buffer: 2048,
            clamp_raw_values: true,
            enable_pause: true,
            trace_instructions: false,
            log_level: "warn".to_string(),
            log_format: LogFormat::Compact,
            default_unit_mode: UnitMode::Logical,
            fake_lights: 4,
        }
    }
}

impl VmConfig {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    /// `<config dir>/lumascript/config.toml`, if the platform has a config
    /// directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Reads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let data = fs::read_to_string(path)
                .with_context(|| format!("reading configuration from {}", path.display()))?;
            toml::from_str::<Self>(&data)
                .with_context(|| format!("parsing configuration {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Loads from the default location, falling back to defaults when there
    /// is no config directory.
    pub fn load_or_default() -> anyhow::Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => {
                let mut config = Self::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("writing configuration to {}", path.display()))?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(level) = env::var(LOG_ENV) {
            if !level.trim().is_empty() {
                self.log_level = level;
            }
        }
    }
}

//=====================================================
// End of file
//=====================================================
