// MIDI event types
// Channel voice messages, channel addressing and time-stamped output records

use serde::{Deserialize, Serialize};

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PITCH_BEND: u8 = 0xE0;
pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// Raw three-byte channel message (status, data1, data2)
pub type MidiBytes = [u8; 3];

/// MIDI channel a kernel listens and talks on
///
/// Channels are numbered 1-16 like on hardware front panels; the status
/// nibble on the wire is `number - 1`. `Omni` listens on every channel and
/// transmits on channel 1. On the wire of configuration files the channel
/// is an integer where `-1` means omni.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum MidiChannel {
    #[default]
    Omni,
    Number(u8),
}

impl MidiChannel {
    /// Creates a numbered channel, clamped to 1-16
    pub fn new(number: u8) -> Self {
        MidiChannel::Number(number.clamp(1, 16))
    }

    /// Parses the integer form used in configuration (-1 = omni, 1..=16)
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            -1 => Some(MidiChannel::Omni),
            1..=16 => Some(MidiChannel::Number(raw as u8)),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> i32 {
        match self {
            MidiChannel::Omni => -1,
            MidiChannel::Number(n) => *n as i32,
        }
    }

    /// Low nibble used when building status bytes
    pub fn status_nibble(&self) -> u8 {
        match self {
            MidiChannel::Omni => 0,
            MidiChannel::Number(n) => n - 1,
        }
    }

    /// Whether a message with this status byte is addressed to us
    pub fn accepts(&self, status: u8) -> bool {
        match self {
            MidiChannel::Omni => true,
            MidiChannel::Number(n) => status & 0x0F == n - 1,
        }
    }

    /// Builds a status byte for a message kind on this channel
    pub fn status(&self, kind: u8) -> u8 {
        (kind & 0xF0) | self.status_nibble()
    }
}

impl TryFrom<i32> for MidiChannel {
    type Error = String;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        MidiChannel::from_raw(raw).ok_or_else(|| format!("invalid MIDI channel {}", raw))
    }
}

impl From<MidiChannel> for i32 {
    fn from(channel: MidiChannel) -> Self {
        channel.as_raw()
    }
}

/// Decoded channel voice message
///
/// `channel` is the raw status nibble (0-15).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend { channel: u8, value: i16 },
}

impl MidiEvent {
    /// Parses a raw MIDI message
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }

        let status = bytes[0];
        let channel = status & 0x0F;

        match status & 0xF0 {
            NOTE_ON => {
                let note = bytes[1];
                let velocity = bytes[2];
                // Velocity 0 = Note Off
                if velocity == 0 {
                    Some(MidiEvent::NoteOff {
                        channel,
                        note,
                        velocity: 0,
                    })
                } else {
                    Some(MidiEvent::NoteOn {
                        channel,
                        note,
                        velocity,
                    })
                }
            }
            NOTE_OFF => Some(MidiEvent::NoteOff {
                channel,
                note: bytes[1],
                velocity: bytes[2],
            }),
            CONTROL_CHANGE => Some(MidiEvent::ControlChange {
                channel,
                controller: bytes[1],
                value: bytes[2],
            }),
            PITCH_BEND => {
                let lsb = (bytes[1] & 0x7F) as i16;
                let msb = (bytes[2] & 0x7F) as i16;
                Some(MidiEvent::PitchBend {
                    channel,
                    value: (msb << 7) | lsb,
                })
            }
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> MidiBytes {
        match *self {
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            } => [NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiEvent::NoteOff {
                channel,
                note,
                velocity,
            } => [NOTE_OFF | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => [
                CONTROL_CHANGE | (channel & 0x0F),
                controller & 0x7F,
                value & 0x7F,
            ],
            MidiEvent::PitchBend { channel, value } => [
                PITCH_BEND | (channel & 0x0F),
                (value & 0x7F) as u8,
                ((value >> 7) & 0x7F) as u8,
            ],
        }
    }

    /// True for note on/off messages
    pub fn is_note(&self) -> bool {
        matches!(self, MidiEvent::NoteOn { .. } | MidiEvent::NoteOff { .. })
    }
}

/// True when the raw bytes are a note on or note off message
pub fn is_note_message(bytes: &[u8]) -> bool {
    matches!(bytes.first().map(|s| s & 0xF0), Some(NOTE_ON) | Some(NOTE_OFF))
}

/// MIDI message stamped with the audio-clock time it is due at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledMidi {
    /// Seconds on the audio clock
    pub time: f64,
    pub bytes: MidiBytes,
}

impl ScheduledMidi {
    pub fn new(time: f64, bytes: MidiBytes) -> Self {
        Self { time, bytes }
    }

    pub fn note_on(time: f64, note: u8, velocity: u8) -> Self {
        Self::new(time, [NOTE_ON, note & 0x7F, velocity & 0x7F])
    }

    pub fn note_off(time: f64, note: u8, velocity: u8) -> Self {
        Self::new(time, [NOTE_OFF, note & 0x7F, velocity & 0x7F])
    }
}
