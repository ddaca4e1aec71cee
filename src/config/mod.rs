//! Configuration Management
//!
//! Loads player settings from TOML files. Configuration includes:
//! - Player settings (playback speed)
//! - Logging filter
//! - Terminal view options (color, timestamps, quiet mode)
//!
//! Search order: explicit `--config` path, `./dreamline.toml`, then
//! `~/.config/dreamline/config.toml`. `DREAMLINE_*` environment variables
//! override whatever was loaded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{DreamlineError, Result};
use crate::timeline::PlayerConfig;

pub const LOCAL_CONFIG: &str = "dreamline.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub ui: UiSettings,

    /// Problems found while loading, reported once logging is up
    #[serde(skip)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerSettings {
    /// Playback speed multiplier; 2.0 plays twice as fast
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            speed: default_speed(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, e.g. "dreamline=debug"
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UiSettings {
    #[serde(default = "default_true")]
    pub color: bool,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    #[serde(default)]
    pub quiet: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            color: true,
            timestamps: true,
            quiet: false,
        }
    }
}

fn default_speed() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}

impl Config {
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(&PathBuf::from(p))?,
            None => {
                let mut candidates = vec![PathBuf::from(LOCAL_CONFIG)];
                if let Some(home) = dirs::home_dir() {
                    candidates.push(home.join(".config/dreamline/config.toml"));
                }

                match candidates.iter().find(|p| p.is_file()) {
                    Some(found) => Self::from_file(found)?,
                    None => Self::default(),
                }
            }
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DreamlineError::Settings(format!(
                "Failed to read config from {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| DreamlineError::Settings(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(s: &str) -> std::result::Result<Self, String> {
        toml::from_str(s).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Override with `DREAMLINE_SPEED`, `DREAMLINE_LOG` and `DREAMLINE_NO_COLOR`.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(speed) = lookup("DREAMLINE_SPEED") {
            match speed.trim().parse::<f64>() {
                Ok(s) => self.player.speed = s,
                Err(_) => self
                    .warnings
                    .push(format!("Ignoring DREAMLINE_SPEED={:?}: not a number", speed)),
            }
        }
        if let Some(filter) = lookup("DREAMLINE_LOG") {
            if !filter.trim().is_empty() {
                self.logging.filter = Some(filter);
            }
        }
        if lookup("DREAMLINE_NO_COLOR").is_some() {
            self.ui.color = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.player_config().validate()?;
        Ok(())
    }

    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            speed: self.player.speed,
        }
    }
}
