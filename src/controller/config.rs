// Parameter configuration records
// The host-facing description of a parameter: `{id, config: {type, ...}}`

use super::ParameterError;
use serde::{Deserialize, Serialize};

/// Typed parameter configuration
///
/// The `type` string of the JSON record is the tag; unknown tags are
/// rejected while parsing so a bad definition fails at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParameterConfig", into = "RawParameterConfig")]
pub enum ParameterConfig {
    Float {
        label: Option<String>,
        default_value: f64,
        min_value: f64,
        max_value: f64,
    },
    Int {
        label: Option<String>,
        default_value: i32,
        min_value: i32,
        max_value: i32,
    },
    Boolean {
        label: Option<String>,
        default_value: bool,
    },
    Choice {
        label: Option<String>,
        default_value: usize,
        choices: Vec<String>,
    },
}

impl ParameterConfig {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterConfig::Float { .. } => "float",
            ParameterConfig::Int { .. } => "int",
            ParameterConfig::Boolean { .. } => "boolean",
            ParameterConfig::Choice { .. } => "choice",
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            ParameterConfig::Float { label, .. }
            | ParameterConfig::Int { label, .. }
            | ParameterConfig::Boolean { label, .. }
            | ParameterConfig::Choice { label, .. } => label.as_deref(),
        }
    }

    pub fn default_value(&self) -> f64 {
        match self {
            ParameterConfig::Float { default_value, .. } => *default_value,
            ParameterConfig::Int { default_value, .. } => *default_value as f64,
            ParameterConfig::Boolean { default_value, .. } => {
                if *default_value {
                    1.0
                } else {
                    0.0
                }
            }
            ParameterConfig::Choice { default_value, .. } => *default_value as f64,
        }
    }

    /// Inclusive numeric range of the parameter
    pub fn range(&self) -> (f64, f64) {
        match self {
            ParameterConfig::Float {
                min_value,
                max_value,
                ..
            } => (*min_value, *max_value),
            ParameterConfig::Int {
                min_value,
                max_value,
                ..
            } => (*min_value as f64, *max_value as f64),
            ParameterConfig::Boolean { .. } => (0.0, 1.0),
            ParameterConfig::Choice { choices, .. } => {
                (0.0, choices.len().saturating_sub(1) as f64)
            }
        }
    }

    /// Clamps (and for discrete types rounds) a value into range
    pub fn clamp(&self, value: f64) -> f64 {
        let (min, max) = self.range();
        let value = if value.is_nan() { self.default_value() } else { value };
        match self {
            ParameterConfig::Float { .. } => value.clamp(min, max),
            _ => value.round().clamp(min, max),
        }
    }

    fn validate(&self) -> Result<(), ParameterError> {
        let (min, max) = self.range();
        if let ParameterConfig::Choice { choices, .. } = self {
            if choices.is_empty() {
                return Err(ParameterError::EmptyChoices);
            }
        }
        if !(min <= max) {
            return Err(ParameterError::InvalidRange { min, max });
        }
        let default = self.default_value();
        if default < min || default > max {
            return Err(ParameterError::DefaultOutOfRange { default, min, max });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParameterConfig {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default)]
    default_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    choices: Option<Vec<String>>,
}

impl TryFrom<RawParameterConfig> for ParameterConfig {
    type Error = ParameterError;

    fn try_from(raw: RawParameterConfig) -> Result<Self, Self::Error> {
        let config = match raw.kind.as_str() {
            "float" => ParameterConfig::Float {
                label: raw.label,
                default_value: raw.default_value,
                min_value: raw.min_value.unwrap_or(0.0),
                max_value: raw.max_value.unwrap_or(1.0),
            },
            "int" => ParameterConfig::Int {
                label: raw.label,
                default_value: raw.default_value.round() as i32,
                min_value: raw.min_value.unwrap_or(0.0).round() as i32,
                max_value: raw.max_value.unwrap_or(127.0).round() as i32,
            },
            "boolean" => ParameterConfig::Boolean {
                label: raw.label,
                default_value: raw.default_value >= 0.5,
            },
            "choice" => ParameterConfig::Choice {
                label: raw.label,
                default_value: raw.default_value.max(0.0).round() as usize,
                choices: raw.choices.unwrap_or_default(),
            },
            other => return Err(ParameterError::UnknownType(other.to_string())),
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<ParameterConfig> for RawParameterConfig {
    fn from(config: ParameterConfig) -> Self {
        let kind = config.type_name().to_string();
        let default_value = config.default_value();
        match config {
            ParameterConfig::Float {
                label,
                min_value,
                max_value,
                ..
            } => RawParameterConfig {
                kind,
                label,
                default_value,
                min_value: Some(min_value),
                max_value: Some(max_value),
                choices: None,
            },
            ParameterConfig::Int {
                label,
                min_value,
                max_value,
                ..
            } => RawParameterConfig {
                kind,
                label,
                default_value,
                min_value: Some(min_value as f64),
                max_value: Some(max_value as f64),
                choices: None,
            },
            ParameterConfig::Boolean { label, .. } => RawParameterConfig {
                kind,
                label,
                default_value,
                min_value: Some(0.0),
                max_value: Some(1.0),
                choices: None,
            },
            ParameterConfig::Choice { label, choices, .. } => RawParameterConfig {
                kind,
                label,
                default_value,
                min_value: Some(0.0),
                max_value: Some(choices.len().saturating_sub(1) as f64),
                choices: Some(choices),
            },
        }
    }
}

/// A parameter as registered with a host: id plus typed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParameterDefinition")]
pub struct ParameterDefinition {
    pub id: String,
    pub config: ParameterConfig,
}

#[derive(Deserialize)]
struct RawParameterDefinition {
    id: String,
    config: ParameterConfig,
}

impl TryFrom<RawParameterDefinition> for ParameterDefinition {
    type Error = ParameterError;

    fn try_from(raw: RawParameterDefinition) -> Result<Self, Self::Error> {
        ParameterDefinition::new(raw.id, raw.config)
    }
}

impl ParameterDefinition {
    /// Validates and builds a definition
    pub fn new(id: impl Into<String>, config: ParameterConfig) -> Result<Self, ParameterError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ParameterError::EmptyId);
        }
        config.validate()?;
        Ok(Self { id, config })
    }

    /// Parses a JSON array of `{id, config}` records
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, ParameterError> {
        Ok(serde_json::from_str(json)?)
    }
}
