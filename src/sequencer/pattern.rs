// Pattern - A looping clip of notes at piano roll resolution
// The control side edits it; the audio side receives snapshots as ClipState

use crate::messaging::command::ProcessorMessage;
use crate::sequencer::note::Note;
use crate::sequencer::timeline::{DEFAULT_CLIP_TICKS, STEP_TICKS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("Clip state needs an id")]
    MissingId,

    #[error("Clip length must be at least one tick")]
    InvalidLength,

    #[error("Invalid note {number} at tick {tick}")]
    InvalidNote { tick: u32, number: u8 },
}

/// Wire snapshot of a clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub length: u32,
    pub notes: Vec<Note>,
}

/// A clip: notes ordered by start tick, at most one per `(tick, number)`
///
/// Every mutation raises the render flag; only the consumer clears it.
#[derive(Debug, Clone)]
pub struct PatternStore {
    id: String,
    length: u32,
    notes: Vec<Note>,
    /// UI snapping grid in ticks; playback ignores it
    pub quantize: u32,
    dirty: bool,
}

impl PatternStore {
    /// Empty 16-step clip with a fresh id
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            length: DEFAULT_CLIP_TICKS,
            notes: Vec::new(),
            quantize: STEP_TICKS,
            dirty: true,
        }
    }

    /// Builds a clip from a snapshot; `id` overrides the snapshot's id
    pub fn from_state(state: &ClipState, id: Option<&str>) -> Result<Self, PatternError> {
        let mut store = Self::with_id(String::new());
        store.set_state(state, id)?;
        Ok(store)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Length in ticks
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn set_length(&mut self, length: u32) -> Result<(), PatternError> {
        if length == 0 {
            return Err(PatternError::InvalidLength);
        }
        self.length = length;
        self.dirty = true;
        Ok(())
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn has_note(&self, tick: u32, number: u8) -> bool {
        self.notes
            .iter()
            .any(|n| n.tick == tick && n.number == number)
    }

    /// Inserts a note in tick order; an occupied `(tick, number)` is left as is
    pub fn add_note(&mut self, tick: u32, number: u8, duration: u32, velocity: u8) {
        self.dirty = true;
        if self.has_note(tick, number) {
            return;
        }

        let index = self.notes.partition_point(|n| n.tick < tick);
        self.notes
            .insert(index, Note::new(tick, number, duration, velocity));
    }

    /// Inserts a note after clearing every note of the same number it would overlap
    pub fn place_note(&mut self, tick: u32, number: u8, duration: u32, velocity: u8) {
        let end = tick.saturating_add(duration);
        self.notes
            .retain(|n| !(n.number == number && n.overlaps(tick, end)));
        self.add_note(tick, number, duration, velocity);
    }

    /// Removes the note at `(tick, number)`, if any
    pub fn remove_note(&mut self, tick: u32, number: u8) {
        self.dirty = true;
        self.notes
            .retain(|n| n.tick != tick || n.number != number);
    }

    pub fn clear(&mut self) {
        self.notes.clear();
        self.dirty = true;
    }

    /// Notes starting exactly on `tick`
    pub fn notes_for_tick(&self, tick: u32) -> &[Note] {
        let start = self.notes.partition_point(|n| n.tick < tick);
        let end = self.notes.partition_point(|n| n.tick <= tick);
        &self.notes[start..end]
    }

    /// Notes of `number` sounding anywhere in `[start_tick, end_tick)`
    pub fn notes_in_tick_range(&self, start_tick: u32, end_tick: u32, number: u8) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| n.number == number && n.overlaps(start_tick, end_tick))
            .collect()
    }

    /// Deep copy of the clip, optionally without its id
    pub fn get_state(&self, include_id: bool) -> ClipState {
        ClipState {
            id: include_id.then(|| self.id.clone()),
            length: self.length,
            notes: self.notes.clone(),
        }
    }

    /// Replaces the clip with a snapshot
    ///
    /// The id comes from `new_id`, falling back to the snapshot's. Notes are
    /// re-sorted by tick and later duplicates of a `(tick, number)` slot are
    /// dropped. Nothing changes if the snapshot is rejected.
    pub fn set_state(&mut self, state: &ClipState, new_id: Option<&str>) -> Result<(), PatternError> {
        let id = new_id
            .map(str::to_string)
            .or_else(|| state.id.clone())
            .ok_or(PatternError::MissingId)?;
        if state.length == 0 {
            return Err(PatternError::InvalidLength);
        }
        if let Some(bad) = state.notes.iter().find(|n| !n.is_valid()) {
            return Err(PatternError::InvalidNote {
                tick: bad.tick,
                number: bad.number,
            });
        }

        let mut seen = HashSet::new();
        let mut notes: Vec<Note> = state
            .notes
            .iter()
            .filter(|n| seen.insert((n.tick, n.number)))
            .copied()
            .collect();
        notes.sort_by_key(|n| n.tick);

        self.id = id;
        self.length = state.length;
        self.notes = notes;
        self.dirty = true;
        Ok(())
    }

    /// Message that hands the current snapshot to a processor
    pub fn clip_message(&self) -> ProcessorMessage {
        ProcessorMessage::Clip {
            id: self.id.clone(),
            state: self.get_state(false),
        }
    }

    pub fn needs_render(&self) -> bool {
        self.dirty
    }

    pub fn set_render_flag(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::new()
    }
}
