//! Configuration module for the compositor
//!
//! Describes where the two streams come from, where they land in the
//! composited frame, and how many dispatcher workers link pads at run time.
//!
//! # Config Location
//!
//! The binary looks for its configuration in this order:
//! 1. The first command line argument
//! 2. The `PIP_COMPOSITOR_CONFIG` environment variable
//! 3. The platform config directory:
//!    - **Linux**: `~/.config/pip-compositor/config.toml`
//!    - **macOS**: `~/Library/Application Support/pip-compositor/config.toml`
//!    - **Windows**: `%APPDATA%\pip-compositor\config.toml`
//! 4. Built-in defaults
//!
//! # Example
//!
//! ```ignore
//! use pip_compositor::config::PipConfig;
//!
//! let mut config = PipConfig::load_or_default("config.toml");
//! config.pip.uri = "file:///videos/camera.mp4".into();
//! config.validate()?;
//! config.save("config.toml")?;
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompositorError, Result};
use crate::pipeline::dispatcher::DEFAULT_WORKERS;
use crate::pipeline::slots::{SlotPosition, DEFAULT_MAX_INPUTS};

/// Directory name under the platform config dir
pub const APP_DIR: &str = "pip-compositor";

/// Config file name
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config path
pub const CONFIG_ENV: &str = "PIP_COMPOSITOR_CONFIG";

// ==================== Config Directory ====================

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
}

/// Pick the config file to load. `None` means built-in defaults.
pub fn resolve_config_path(cli_arg: Option<&str>) -> Option<PathBuf> {
    if let Some(arg) = cli_arg.filter(|a| !a.is_empty()) {
        return Some(PathBuf::from(arg));
    }
    if let Some(env) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(env));
    }
    default_config_path().filter(|p| p.exists())
}

// ==================== Pipeline Config ====================

/// One input stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Media location, e.g. `file:///videos/a.mp4` or `sim://main`
    pub uri: String,
    /// Placement in the composited frame
    #[serde(default)]
    pub position: SlotPosition,
}

impl SourceConfig {
    pub fn new(uri: impl Into<String>, position: SlotPosition) -> Self {
        Self {
            uri: uri.into(),
            position,
        }
    }
}

/// Compositor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Number of request inputs the mixer hands out
    pub max_inputs: usize,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            max_inputs: DEFAULT_MAX_INPUTS,
        }
    }
}

/// Link dispatcher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Worker threads linking announced pads
    pub workers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Complete compositor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipConfig {
    /// Full-frame background stream
    pub main: SourceConfig,
    /// Inset stream drawn on top
    pub pip: SourceConfig,
    pub mixer: MixerConfig,
    pub dispatch: DispatchConfig,
}

impl Default for PipConfig {
    fn default() -> Self {
        Self {
            main: SourceConfig::new(
                "sim://main?duration_ms=3000",
                SlotPosition {
                    xpos: 0,
                    ypos: 0,
                    width: 1280,
                    height: 720,
                    zorder: 0,
                    alpha: 1.0,
                },
            ),
            pip: SourceConfig::new(
                "sim://pip?duration_ms=3000",
                SlotPosition {
                    xpos: 880,
                    ypos: 500,
                    width: 320,
                    height: 180,
                    zorder: 1,
                    alpha: 1.0,
                },
            ),
            mixer: MixerConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl PipConfig {
    /// Logical sources in mixer slot order.
    pub fn sources(&self) -> [(&'static str, &SourceConfig); 2] {
        [("main", &self.main), ("pip", &self.pip)]
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompositorError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            CompositorError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load a config file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Save config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CompositorError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| CompositorError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            CompositorError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject settings the pipeline cannot be built from
    pub fn validate(&self) -> Result<()> {
        for (role, source) in self.sources() {
            if source.uri.trim().is_empty() {
                return Err(CompositorError::Config(format!("{}.uri is empty", role)));
            }
            let p = &source.position;
            if p.width == 0 || p.height == 0 {
                return Err(CompositorError::Config(format!(
                    "{}.position must have a non-zero size",
                    role
                )));
            }
            if !(0.0..=1.0).contains(&p.alpha) {
                return Err(CompositorError::Config(format!(
                    "{}.position.alpha must be within 0.0..=1.0",
                    role
                )));
            }
        }
        if self.mixer.max_inputs == 0 {
            return Err(CompositorError::Config(
                "mixer.max_inputs must be at least 1".to_string(),
            ));
        }
        if self.dispatch.workers == 0 {
            return Err(CompositorError::Config(
                "dispatch.workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
