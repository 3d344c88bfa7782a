// Processor messages - Control thread -> audio thread
// Serialized as `{"action": "...", ...}` records

use crate::sequencer::pattern::ClipState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ProcessorMessage {
    /// Stores (or replaces) the clip snapshot under `id`
    Clip { id: String, state: ClipState },
    /// Switches playback to clip `id` at the next render quantum
    Play { id: String },
}

impl ProcessorMessage {
    pub fn clip_id(&self) -> &str {
        match self {
            ProcessorMessage::Clip { id, .. } | ProcessorMessage::Play { id } => id,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
