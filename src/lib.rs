// Sequencer Party - Library exports for tests and benchmarks

pub mod config;
pub mod controller;
pub mod messaging;
pub mod midi;
pub mod registry;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use config::{ConfigError, EngineConfig, SchedulerConfig};
pub use controller::{ControllerProcessor, MicrokorgKernel, ParameterHost, SynthParameter};
pub use messaging::{Notification, ProcessorMessage, create_message_channel, create_notification_channel};
pub use midi::{MidiChannel, MidiEvent, ScheduledMidi, pack_korg, unpack_korg};
pub use registry::{Processor, ProcessorRegistry};
pub use sequencer::{
    Chorder, FunctionSequencer, PatternStore, PianoRollProcessor, TickScheduler, TransportLedger,
};
