// Controller module - MIDI controller parameter synchronization
// Parameters, their host configuration, kernels and the processor driving them

pub mod config;
pub mod host;
pub mod kernel;
pub mod microkorg;
pub mod parameter;
pub mod processor;

pub use config::{ParameterConfig, ParameterDefinition};
pub use host::ParameterHost;
pub use kernel::{CcKernel, ControllerKernel, ParameterSet};
pub use microkorg::MicrokorgKernel;
pub use parameter::{AutomationEvent, ParameterKind, SelectOption, SynthParameter};
pub use processor::{ControllerConfig, ControllerProcessor, MidiPassThrough, OutboundEvent};

#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("Parameter id must not be empty")]
    EmptyId,

    #[error("Unknown parameter type: {0}")]
    UnknownType(String),

    #[error("Invalid parameter range: {min}..{max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("Default value {default} outside {min}..{max}")]
    DefaultOutOfRange { default: f64, min: f64, max: f64 },

    #[error("Choice parameter needs at least one choice")]
    EmptyChoices,

    #[error("Duplicate parameter id: {0}")]
    DuplicateId(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
