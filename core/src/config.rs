//! Configuration management (config.toml)
//!
//! Handles loading, saving, and providing defaults for audio settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::sound_output::SoundOutput;

/// Errors from explicit config file loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Output device and tone settings
    #[serde(default)]
    pub audio: AudioConfig,
    /// Frame loop settings
    #[serde(default)]
    pub timing: TimingConfig,
    /// Diagnostics
    #[serde(default)]
    pub debug: DebugConfig,
}

/// Audio configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output sample rate (default: 48000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Requested device ring size in milliseconds (default: 100)
    #[serde(default = "default_buffer_ms")]
    pub buffer_ms: u32,
    /// Tone frequency in Hz (default: 256)
    #[serde(default = "default_tone_hz")]
    pub tone_hz: f32,
    /// Tone amplitude in 16-bit units (default: 3000)
    #[serde(default = "default_tone_volume")]
    pub tone_volume: f32,
    /// Stereo position, -100..=100 (default: 0)
    #[serde(default)]
    pub pan: f32,
}

/// Frame loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Target visual frame rate (default: 60)
    #[serde(default = "default_game_update_hz")]
    pub game_update_hz: u32,
    /// Halve the frame rate when frames are consistently missed (default: true)
    #[serde(default = "default_true")]
    pub adaptive_frame_rate: bool,
}

/// Diagnostics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DebugConfig {
    /// Record per-frame sync markers (default: false)
    #[serde(default)]
    pub markers: bool,
}

fn default_sample_rate() -> u32 {
    48_000
}
fn default_buffer_ms() -> u32 {
    100
}
fn default_tone_hz() -> f32 {
    256.0
}
fn default_tone_volume() -> f32 {
    3000.0
}
fn default_game_update_hz() -> u32 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_ms: default_buffer_ms(),
            tone_hz: default_tone_hz(),
            tone_volume: default_tone_volume(),
            pan: 0.0,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            game_update_hz: default_game_update_hz(),
            adaptive_frame_rate: default_true(),
        }
    }
}

impl Config {
    /// Build the sound output descriptor these settings describe.
    pub fn sound_output(&self) -> SoundOutput {
        let mut sound = SoundOutput::new(self.audio.sample_rate, self.timing.game_update_hz);
        sound.tone_hz = self.audio.tone_hz;
        sound.tone_volume = self.audio.tone_volume;
        sound.set_pan(self.audio.pan);
        sound
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\framefill\config`
/// On macOS: `~/Library/Application Support/io.framefill.framefill`
/// On Linux: `~/.config/framefill`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.framefill", "", "framefill")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from the platform config directory.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> Config {
    config_dir()
        .and_then(|dir| load_from(&dir.join("config.toml")).ok())
        .unwrap_or_default()
}

/// Loads the configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Saves the configuration to the platform config directory.
///
/// Creates the directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    if let Some(dir) = config_dir() {
        save_to(config, &dir.join("config.toml"))?;
    }
    Ok(())
}

/// Saves the configuration to an explicit path.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
