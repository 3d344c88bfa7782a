// Chorder - Expands each held note into a chord of semitone offsets

use crate::controller::config::{ParameterConfig, ParameterDefinition};
use crate::controller::{ParameterError, ParameterHost};
use crate::midi::{MidiBytes, MidiEvent, ScheduledMidi};
use crate::registry::Processor;
use crate::sequencer::transport::TransportLedger;

pub const OFFSET_IDS: [&str; 6] = [
    "offset1", "offset2", "offset3", "offset4", "offset5", "offset6",
];

/// Offsets in semitones, each within this range
pub const OFFSET_RANGE: (i32, i32) = (-24, 24);

/// Note-on becomes the played note plus every distinct non-zero offset that
/// stays within 0..=127. Note-off releases exactly the notes its note-on
/// produced, even if the offsets changed in between.
pub struct Chorder {
    host: ParameterHost,
    /// Sounding notes per played note; empty when not held
    held: Vec<Vec<u8>>,
}

impl Chorder {
    pub fn new() -> Result<Self, ParameterError> {
        let definitions = OFFSET_IDS
            .iter()
            .enumerate()
            .map(|(i, id)| {
                ParameterDefinition::new(
                    *id,
                    ParameterConfig::Int {
                        label: Some(format!("Offset {}", i + 1)),
                        default_value: 0,
                        min_value: OFFSET_RANGE.0,
                        max_value: OFFSET_RANGE.1,
                    },
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            host: ParameterHost::with_definitions(definitions)?,
            held: vec![Vec::new(); 128],
        })
    }

    pub fn host(&self) -> &ParameterHost {
        &self.host
    }

    pub fn set_parameter(&mut self, id: &str, value: f64) -> Result<f64, ParameterError> {
        self.host.set_value(id, value)
    }

    /// Distinct non-zero offsets in parameter order
    pub fn offsets(&self) -> Vec<i32> {
        let mut offsets: Vec<i32> = Vec::with_capacity(OFFSET_IDS.len());
        for (_, value) in self.host.iter() {
            let offset = value.round() as i32;
            if offset != 0 && !offsets.contains(&offset) {
                offsets.push(offset);
            }
        }
        offsets
    }

    /// The played note followed by its in-range offset notes
    pub fn chord_notes(&self, note: u8) -> Vec<u8> {
        let mut notes = vec![note];
        notes.extend(
            self.offsets()
                .into_iter()
                .map(|offset| note as i32 + offset)
                .filter(|n| (0..=127).contains(n))
                .map(|n| n as u8),
        );
        notes
    }

    pub fn is_held(&self, note: u8) -> bool {
        !self.held[(note & 0x7F) as usize].is_empty()
    }

    fn release(&mut self, time: f64, channel: u8, note: u8, velocity: u8, output: &mut Vec<ScheduledMidi>) -> bool {
        let notes = std::mem::take(&mut self.held[note as usize]);
        if notes.is_empty() {
            return false;
        }
        output.extend(notes.into_iter().map(|n| {
            ScheduledMidi::new(
                time,
                MidiEvent::NoteOff {
                    channel,
                    note: n,
                    velocity,
                }
                .to_bytes(),
            )
        }));
        true
    }
}

impl Processor for Chorder {
    fn process(
        &mut self,
        _ledger: &TransportLedger,
        _from: f64,
        _to: f64,
        _output: &mut Vec<ScheduledMidi>,
    ) {
    }

    fn on_midi(&mut self, time: f64, bytes: MidiBytes, output: &mut Vec<ScheduledMidi>) {
        match MidiEvent::from_bytes(&bytes) {
            Some(MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            }) => {
                let note = note & 0x7F;
                // retrigger without a note-off in between
                self.release(time, channel, note, 0, output);

                let notes = self.chord_notes(note);
                output.extend(notes.iter().map(|&n| {
                    ScheduledMidi::new(
                        time,
                        MidiEvent::NoteOn {
                            channel,
                            note: n,
                            velocity,
                        }
                        .to_bytes(),
                    )
                }));
                self.held[note as usize] = notes;
            }
            Some(MidiEvent::NoteOff {
                channel,
                note,
                velocity,
            }) => {
                if !self.release(time, channel, note & 0x7F, velocity, output) {
                    output.push(ScheduledMidi::new(time, bytes));
                }
            }
            _ => output.push(ScheduledMidi::new(time, bytes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(events: &[ScheduledMidi]) -> Vec<MidiBytes> {
        events.iter().map(|e| e.bytes).collect()
    }

    fn chorder(offsets: &[f64]) -> Chorder {
        let mut chorder = Chorder::new().unwrap();
        for (id, value) in OFFSET_IDS.iter().zip(offsets) {
            chorder.set_parameter(id, *value).unwrap();
        }
        chorder
    }

    #[test]
    fn test_no_offsets_plays_single_note() {
        let mut chorder = chorder(&[]);
        let mut output = Vec::new();
        chorder.on_midi(0.0, [0x90, 60, 100], &mut output);
        assert_eq!(bytes(&output), vec![[0x90, 60, 100]]);
    }

    #[test]
    fn test_offsets_deduplicated_and_clamped() {
        let chorder = chorder(&[4.0, 7.0, 4.0, 0.0, 12.0, 40.0]);
        assert_eq!(chorder.offsets(), vec![4, 7, 12, 24]);
        assert_eq!(chorder.chord_notes(60), vec![60, 64, 67, 72, 84]);
        // 120 + 12 and 120 + 24 fall off the top
        assert_eq!(chorder.chord_notes(120), vec![120, 124, 127]);
    }

    #[test]
    fn test_note_off_releases_what_was_played() {
        let mut chorder = chorder(&[4.0, 7.0]);
        let mut output = Vec::new();
        chorder.on_midi(0.0, [0x92, 60, 100], &mut output);
        assert_eq!(
            bytes(&output),
            vec![[0x92, 60, 100], [0x92, 64, 100], [0x92, 67, 100]]
        );
        assert!(chorder.is_held(60));

        chorder.set_parameter("offset2", -5.0).unwrap();
        output.clear();
        chorder.on_midi(1.0, [0x82, 60, 64], &mut output);
        assert_eq!(
            bytes(&output),
            vec![[0x82, 60, 64], [0x82, 64, 64], [0x82, 67, 64]]
        );
        assert!(!chorder.is_held(60));
    }

    #[test]
    fn test_zero_velocity_note_on_releases() {
        let mut chorder = chorder(&[12.0]);
        let mut output = Vec::new();
        chorder.on_midi(0.0, [0x90, 48, 90], &mut output);
        output.clear();
        chorder.on_midi(0.5, [0x90, 48, 0], &mut output);
        assert_eq!(bytes(&output), vec![[0x80, 48, 0], [0x80, 60, 0]]);
    }

    #[test]
    fn test_other_messages_pass_through() {
        let mut chorder = chorder(&[3.0]);
        let mut output = Vec::new();
        chorder.on_midi(0.0, [0xB0, 1, 64], &mut output);
        chorder.on_midi(0.0, [0x80, 50, 0], &mut output);
        assert_eq!(bytes(&output), vec![[0xB0, 1, 64], [0x80, 50, 0]]);
    }

    #[test]
    fn test_retrigger_releases_previous_chord() {
        let mut chorder = chorder(&[5.0]);
        let mut output = Vec::new();
        chorder.on_midi(0.0, [0x90, 60, 100], &mut output);
        output.clear();
        chorder.on_midi(0.1, [0x90, 60, 80], &mut output);
        assert_eq!(
            bytes(&output),
            vec![[0x80, 60, 0], [0x80, 65, 0], [0x90, 60, 80], [0x90, 65, 80]]
        );
    }
}
