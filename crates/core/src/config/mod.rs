use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BeatConfig, FxError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub beat: BeatConfig,
    pub runner: RunnerConfig,
}

impl AppConfig {
    /// Parses a JSON document. Missing sections and fields fall back to
    /// their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.beat.validate()?;
        self.runner.validate()
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Analysis window length in samples.
    pub block_size: usize,
    /// Temporal smoothing applied to the spectrum, in [0, 1).
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 2048,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(FxError::InvalidConfig("audio.sample_rate must be positive".into()));
        }
        if self.block_size < 2 {
            return Err(FxError::InvalidConfig("audio.block_size must be at least 2".into()));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(FxError::InvalidConfig("audio.smoothing must be in [0, 1)".into()));
        }
        if self.min_db >= self.max_db {
            return Err(FxError::InvalidConfig(
                "audio.min_db must be below audio.max_db".into(),
            ));
        }
        Ok(())
    }
}

/// Defaults for headless rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 60,
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FxError::InvalidConfig("runner surface must not be empty".into()));
        }
        if self.fps == 0 {
            return Err(FxError::InvalidConfig("runner.fps must be positive".into()));
        }
        Ok(())
    }

    /// Frame spacing in milliseconds.
    pub fn frame_ms(&self) -> f64 {
        1000.0 / self.fps as f64
    }
}
