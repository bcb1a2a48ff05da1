// Engine configuration - Playback defaults loaded from RON

use crate::sequencer::arpeggiator::ArpeggiatorConfig;
use crate::sequencer::playhead::PlayheadSettings;
use crate::sequencer::timeline::{DEFAULT_MAX_LOOP_BARS, Tempo};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Playback and export defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bpm: Tempo,
    pub max_loop_bars: usize,
    pub chord_velocity: u8,
    pub melody_velocity: u8,
    pub drum_velocity: u8,
    /// Sounding part of each sub-chord during live playback
    pub chord_gate: f64,
    pub chord_arp: ArpeggiatorConfig,
    pub melody_arp: ArpeggiatorConfig,
    pub playhead: PlayheadSettings,
    pub render_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bpm: Tempo::default(),
            max_loop_bars: DEFAULT_MAX_LOOP_BARS,
            chord_velocity: 80,
            melody_velocity: 80,
            drum_velocity: 100,
            chord_gate: 0.9,
            chord_arp: ArpeggiatorConfig::default(),
            melody_arp: ArpeggiatorConfig::default(),
            playhead: PlayheadSettings::default(),
            render_channel_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Load and validate a RON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&text)?;
        log::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate RON text
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_loop_bars < 1 {
            return Err(ConfigError::Invalid(
                "max_loop_bars must be at least 1".to_string(),
            ));
        }
        if self.chord_arp.octaves < 1 || self.melody_arp.octaves < 1 {
            return Err(ConfigError::Invalid(
                "Arpeggiator octaves must be at least 1".to_string(),
            ));
        }
        for (name, velocity) in [
            ("chord_velocity", self.chord_velocity),
            ("melody_velocity", self.melody_velocity),
            ("drum_velocity", self.drum_velocity),
        ] {
            if velocity > 127 {
                return Err(ConfigError::Invalid(format!(
                    "{} {} is out of range (0-127)",
                    name, velocity
                )));
            }
        }
        if !(self.chord_gate > 0.0 && self.chord_gate <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "chord_gate {} must be in (0, 1]",
                self.chord_gate
            )));
        }
        if self.playhead.bar_width <= 0.0 {
            return Err(ConfigError::Invalid(
                "Playhead bar width must be positive".to_string(),
            ));
        }
        if self.render_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "render_channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
