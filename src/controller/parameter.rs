// Synth parameter - one device parameter kept in sync between host and MIDI
// Int, Boolean and Select variants over a shared wire messenger

use super::config::{ParameterConfig, ParameterDefinition};
use crate::midi::{MidiBytes, MidiChannel, WireMessenger};
use serde::{Deserialize, Serialize};

/// One entry of a select parameter: wire value plus display label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: u16,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: u16, label: &str) -> Self {
        Self {
            value,
            label: label.to_string(),
        }
    }
}

/// Value domain of a parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    /// Integer range; a negative minimum is offset to start at 0 on the wire
    Int { default: i32, min: i32, max: i32 },
    /// 0 or 1, sent as one of two wire values
    Boolean {
        default: bool,
        off_midi: u16,
        on_midi: u16,
    },
    /// Index into `options`; the option's value goes on the wire
    Select {
        default: usize,
        options: Vec<SelectOption>,
    },
}

/// Host automation event emitted when a value changed from the device side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationEvent {
    pub id: String,
    pub value: i32,
    pub normalized: bool,
}

/// A device parameter
///
/// `midi_dirty` marks a local change that has not been transmitted yet;
/// `automation_dirty` marks a device-side change the host has not seen.
/// Values arriving from the device never set `midi_dirty`, so they are not
/// echoed back.
#[derive(Debug, Clone)]
pub struct SynthParameter {
    id: String,
    label: String,
    messenger: WireMessenger,
    kind: ParameterKind,
    value: i32,
    midi_dirty: bool,
    automation_dirty: bool,
}

impl SynthParameter {
    fn with_kind(id: &str, label: &str, messenger: WireMessenger, kind: ParameterKind) -> Self {
        assert!(!id.is_empty(), "Parameter id must not be empty");
        let value = match &kind {
            ParameterKind::Int { default, .. } => *default,
            ParameterKind::Boolean { default, .. } => *default as i32,
            ParameterKind::Select { default, .. } => *default as i32,
        };
        Self {
            id: id.to_string(),
            label: label.to_string(),
            messenger,
            kind,
            value,
            midi_dirty: false,
            automation_dirty: false,
        }
    }

    pub fn int(
        id: &str,
        label: &str,
        messenger: WireMessenger,
        default: i32,
        min: i32,
        max: i32,
    ) -> Self {
        assert!(min <= max, "Parameter minimum must not exceed maximum");
        assert!(
            (min..=max).contains(&default),
            "Parameter default must be within range"
        );
        Self::with_kind(id, label, messenger, ParameterKind::Int { default, min, max })
    }

    pub fn boolean(
        id: &str,
        label: &str,
        messenger: WireMessenger,
        default: bool,
        off_midi: u16,
        on_midi: u16,
    ) -> Self {
        Self::with_kind(
            id,
            label,
            messenger,
            ParameterKind::Boolean {
                default,
                off_midi,
                on_midi,
            },
        )
    }

    pub fn select(
        id: &str,
        label: &str,
        messenger: WireMessenger,
        default: usize,
        options: Vec<SelectOption>,
    ) -> Self {
        assert!(!options.is_empty(), "Select parameter needs options");
        assert!(default < options.len(), "Select default must be an option index");
        Self::with_kind(id, label, messenger, ParameterKind::Select { default, options })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    pub fn messenger(&self) -> &WireMessenger {
        &self.messenger
    }

    pub fn is_midi_dirty(&self) -> bool {
        self.midi_dirty
    }

    pub fn is_automation_dirty(&self) -> bool {
        self.automation_dirty
    }

    pub fn min(&self) -> i32 {
        match &self.kind {
            ParameterKind::Int { min, .. } => *min,
            _ => 0,
        }
    }

    pub fn max(&self) -> i32 {
        match &self.kind {
            ParameterKind::Int { max, .. } => *max,
            ParameterKind::Boolean { .. } => 1,
            ParameterKind::Select { options, .. } => options.len() as i32 - 1,
        }
    }

    fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min(), self.max())
    }

    /// Host-facing configuration record
    pub fn to_wam(&self) -> ParameterDefinition {
        let label = Some(self.label.clone());
        let config = match &self.kind {
            ParameterKind::Int { default, min, max } => ParameterConfig::Int {
                label,
                default_value: *default,
                min_value: *min,
                max_value: *max,
            },
            ParameterKind::Boolean { default, .. } => ParameterConfig::Boolean {
                label,
                default_value: *default,
            },
            ParameterKind::Select { default, options } => ParameterConfig::Choice {
                label,
                default_value: *default,
                choices: options.iter().map(|o| o.label.clone()).collect(),
            },
        };
        ParameterDefinition {
            id: self.id.clone(),
            config,
        }
    }

    /// Value as it is transmitted on the wire
    pub fn wire_value(&self) -> u16 {
        match &self.kind {
            ParameterKind::Int { min, .. } => (self.value - (*min).min(0)).max(0) as u16,
            ParameterKind::Boolean {
                off_midi, on_midi, ..
            } => {
                if self.value != 0 {
                    *on_midi
                } else {
                    *off_midi
                }
            }
            ParameterKind::Select { options, .. } => options[self.value as usize].value,
        }
    }

    fn from_wire(&self, raw: u16) -> Option<i32> {
        match &self.kind {
            ParameterKind::Int { min, .. } => Some(self.clamp(raw as i32 + (*min).min(0))),
            ParameterKind::Boolean { on_midi, .. } => Some((raw == *on_midi) as i32),
            ParameterKind::Select { options, .. } => {
                options.iter().position(|o| o.value == raw).map(|i| i as i32)
            }
        }
    }

    /// Applies a host/UI value; returns whether it changed
    ///
    /// The value is clamped into range first. A change marks the parameter
    /// for transmission.
    pub fn parameter_update(&mut self, new_value: i32) -> bool {
        let clamped = self.clamp(new_value);
        if clamped != new_value {
            if let ParameterKind::Select { .. } = self.kind {
                log::warn!(
                    "select {}: no option at index {}, using {}",
                    self.id,
                    new_value,
                    clamped
                );
            }
        }

        let changed = clamped != self.value;
        if changed {
            self.midi_dirty = true;
        }
        self.value = clamped;
        changed
    }

    /// Feeds one inbound MIDI message; returns whether the value changed
    pub fn ingest_midi(&mut self, channel: MidiChannel, bytes: &[u8]) -> bool {
        let current = self.wire_value();
        let Some(raw) = self.messenger.ingest(channel, bytes, current) else {
            return false;
        };
        if raw == current {
            return false;
        }

        match self.from_wire(raw) {
            Some(value) if value != self.value => {
                self.value = value;
                self.midi_dirty = false;
                self.automation_dirty = true;
                true
            }
            _ => false,
        }
    }

    /// Value as stored in a bulk dump (option value for selects)
    pub fn sysex_value(&self) -> i32 {
        match &self.kind {
            ParameterKind::Select { options, .. } => options[self.value as usize].value as i32,
            _ => self.value,
        }
    }

    /// Maps a bulk dump value back to a parameter value
    pub fn decode_sysex_value(&self, raw: i32) -> Option<i32> {
        match &self.kind {
            ParameterKind::Int { .. } => Some(self.clamp(raw)),
            ParameterKind::Boolean { .. } => Some((raw != 0) as i32),
            ParameterKind::Select { options, .. } => {
                options.iter().position(|o| o.value as i32 == raw).map(|i| i as i32)
            }
        }
    }

    /// Applies a value loaded from a bulk dump; returns whether it changed
    pub fn update_from_sysex(&mut self, value: i32) -> bool {
        let value = self.clamp(value);
        if value == self.value {
            return false;
        }
        self.value = value;
        self.midi_dirty = false;
        self.automation_dirty = true;
        true
    }

    /// Outbound MIDI for a pending local change (or unconditionally with `force`)
    pub fn midi_message(&mut self, channel: MidiChannel, force: bool) -> Vec<MidiBytes> {
        if !self.midi_dirty && !force {
            return Vec::new();
        }
        self.midi_dirty = false;
        self.messenger.outbound(channel, self.wire_value())
    }

    /// Automation event for a pending device-side change
    pub fn automation_message(&mut self, force: bool) -> Option<AutomationEvent> {
        if !self.automation_dirty && !force {
            return None;
        }
        self.automation_dirty = false;
        Some(AutomationEvent {
            id: self.id.clone(),
            value: self.value,
            normalized: false,
        })
    }

    /// True when a pending change can only be sent inside a bulk dump
    pub fn sysex_needed(&self) -> bool {
        self.midi_dirty && self.messenger.sysex_needed()
    }

    /// Marks a pending change as transmitted (by a bulk dump)
    pub fn mark_transmitted(&mut self) {
        self.midi_dirty = false;
    }
}
