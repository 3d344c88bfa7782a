// Engine configuration - RON or JSON files with per-subsystem sections
// Missing sections and fields fall back to defaults

use crate::controller::ControllerConfig;
use crate::sequencer::timeline::{FUNCTION_SEQ_PPQN, PIANO_ROLL_PPQN};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tick resolution and note timing for one sequencer
///
/// A section that is present must name its `ppqn`; the resolution differs
/// per sequencer, so there is no shared fallback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub ppqn: u32,
    /// Seconds a note-off is pulled ahead of the next note's start
    #[serde(default = "default_note_off_lead")]
    pub note_off_lead: f64,
}

fn default_note_off_lead() -> f64 {
    0.001
}

impl SchedulerConfig {
    pub fn piano_roll() -> Self {
        Self {
            ppqn: PIANO_ROLL_PPQN,
            note_off_lead: default_note_off_lead(),
        }
    }

    pub fn function_sequencer() -> Self {
        Self {
            ppqn: FUNCTION_SEQ_PPQN,
            note_off_lead: default_note_off_lead(),
        }
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.ppqn == 0 {
            return Err(ConfigError::Invalid(format!("{}.ppqn must be positive", section)));
        }
        if !(self.note_off_lead >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{}.note_off_lead must not be negative",
                section
            )));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::piano_roll()
    }
}

/// Ring buffer capacities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub messages: usize,
    pub notifications: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            messages: 256,
            notifications: 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "SchedulerConfig::piano_roll")]
    pub piano_roll: SchedulerConfig,
    #[serde(default = "SchedulerConfig::function_sequencer")]
    pub function_sequencer: SchedulerConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub channels: ChannelConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            piano_roll: SchedulerConfig::piano_roll(),
            function_sequencer: SchedulerConfig::function_sequencer(),
            controller: ControllerConfig::default(),
            channels: ChannelConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_ron_str(ron_data: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(ron_data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json_data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json_data)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a `.ron` or `.json` file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Self::from_ron_str(&data),
            Some("json") => Self::from_json_str(&data),
            _ => Err(ConfigError::Invalid(format!(
                "Unsupported config file: {}",
                path.display()
            ))),
        }
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Invalid(format!("Failed to serialize to RON: {}", e)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.piano_roll.validate("piano_roll")?;
        self.function_sequencer.validate("function_sequencer")?;

        if !(self.controller.sysex_debounce >= 0.0) {
            return Err(ConfigError::Invalid(
                "controller.sysex_debounce must not be negative".to_string(),
            ));
        }
        if self.channels.messages == 0 || self.channels.notifications == 0 {
            return Err(ConfigError::Invalid(
                "Channel capacities must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
