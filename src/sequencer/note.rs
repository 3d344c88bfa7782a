// Note representation for the sequencer
// A note starts on a tick of its clip and lasts a whole number of ticks

use serde::{Deserialize, Serialize};

/// A note in a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    /// Start tick within the clip
    pub tick: u32,

    /// MIDI note number (0-127, where 60 = C4)
    pub number: u8,

    /// Length in ticks (> 0)
    pub duration: u32,

    /// MIDI velocity (0-127)
    pub velocity: u8,
}

impl Note {
    /// Out-of-range values are clamped: 7-bit number and velocity, at least one tick
    pub fn new(tick: u32, number: u8, duration: u32, velocity: u8) -> Self {
        Self {
            tick,
            number: number.min(127),
            duration: duration.max(1),
            velocity: velocity.min(127),
        }
    }

    /// False for notes that did not come through `new` (e.g. deserialized)
    pub fn is_valid(&self) -> bool {
        self.number <= 127 && self.velocity <= 127 && self.duration > 0
    }

    /// First tick after the note
    pub fn end_tick(&self) -> u32 {
        self.tick.saturating_add(self.duration)
    }

    pub fn contains_tick(&self, tick: u32) -> bool {
        tick >= self.tick && tick < self.end_tick()
    }

    /// True if `[tick, end_tick)` intersects `[start, end)`
    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        self.tick < end && start < self.end_tick()
    }

    /// Get the note name (e.g., "C4", "A#5")
    pub fn note_name(&self) -> String {
        const NOTE_NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];

        let octave = (self.number / 12) as i32 - 1;
        format!("{}{}", NOTE_NAMES[(self.number % 12) as usize], octave)
    }
}
