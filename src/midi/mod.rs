// MIDI module - wire-level types shared by the sequencers and controller kernels

pub mod event;
pub mod messenger;
pub mod sysex;

pub use event::{MidiBytes, MidiChannel, MidiEvent, ScheduledMidi};
pub use messenger::{NrpnMessenger, NrpnResolution, WireMessenger};
pub use sysex::{SysexError, pack_korg, unpack_korg};
