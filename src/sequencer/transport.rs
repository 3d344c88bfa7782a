// Transport - Tempo and play-state history keyed by wall-clock time
// Answers "where is the playhead at time T" for every sequencer in the engine

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid tempo: {0} BPM")]
    InvalidTempo(f64),

    #[error("Beats per bar must be at least 1")]
    InvalidBeatsPerBar,

    #[error("Tempo ramp must end after it starts ({start}..{end})")]
    InvalidRamp { start: f64, end: f64 },
}

/// Linear tempo change from the segment's start tempo
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoRamp {
    pub end_tempo: f64,
    pub end_time: f64,
}

/// One contiguous tempo regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportSegment {
    /// Wall-clock seconds
    pub start_time: f64,
    /// Bars (fractional) at `start_time`
    pub start_bar_position: f64,
    pub beats_per_bar: u32,
    /// BPM
    pub start_tempo: f64,
    pub ramp: Option<TempoRamp>,
    pub playing: bool,
}

impl TransportSegment {
    pub fn fixed(
        start_time: f64,
        start_bar_position: f64,
        beats_per_bar: u32,
        tempo: f64,
        playing: bool,
    ) -> Self {
        Self {
            start_time,
            start_bar_position,
            beats_per_bar,
            start_tempo: tempo,
            ramp: None,
            playing,
        }
    }

    /// A playing segment whose tempo moves linearly until `end_time`
    pub fn ramp(
        start_time: f64,
        start_bar_position: f64,
        beats_per_bar: u32,
        start_tempo: f64,
        end_tempo: f64,
        end_time: f64,
    ) -> Self {
        Self {
            start_time,
            start_bar_position,
            beats_per_bar,
            start_tempo,
            ramp: Some(TempoRamp {
                end_tempo,
                end_time,
            }),
            playing: true,
        }
    }

    /// Instantaneous tempo; a finished ramp holds its end tempo
    pub fn tempo_at(&self, time: f64) -> f64 {
        match self.ramp {
            None => self.start_tempo,
            Some(ramp) => {
                let duration = ramp.end_time - self.start_time;
                let elapsed = (time - self.start_time).clamp(0.0, duration);
                self.start_tempo + (ramp.end_tempo - self.start_tempo) * (elapsed / duration)
            }
        }
    }

    /// Beats advanced between `start_time` and `time`
    ///
    /// Ramps integrate the linear tempo curve in closed form; past the ramp's
    /// end the segment continues at the end tempo. Times before the segment
    /// start count as zero.
    pub fn beats_since_start(&self, time: f64) -> f64 {
        let elapsed = (time - self.start_time).max(0.0);
        match self.ramp {
            None => elapsed * self.start_tempo / 60.0,
            Some(ramp) => {
                let duration = ramp.end_time - self.start_time;
                let accel = ((ramp.end_tempo - self.start_tempo) / 60.0) / duration;
                let t = elapsed.min(duration);
                let mut beats = 0.5 * accel * t * t + (self.start_tempo / 60.0) * t;
                if elapsed > duration {
                    beats += (elapsed - duration) * ramp.end_tempo / 60.0;
                }
                beats
            }
        }
    }

    /// Bar position at `time`
    ///
    /// Play state does not enter the formula: a stopped segment keeps
    /// advancing and consumers check `playing` before acting on ticks.
    pub fn bar_position_at(&self, time: f64) -> f64 {
        self.start_bar_position + self.beats_since_start(time) / self.beats_per_bar as f64
    }
}

/// Time-ordered transport history
///
/// Always holds at least one segment. The segment in effect at time T is the
/// latest one starting at or before T; queries before the first segment use
/// the first segment.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportLedger {
    segments: Vec<TransportSegment>,
    current_time: f64,
}

impl TransportLedger {
    /// Stopped 4/4 at 120 BPM, bar 0, time 0
    pub fn new() -> Self {
        Self {
            segments: vec![TransportSegment::fixed(0.0, 0.0, 4, 120.0, false)],
            current_time: 0.0,
        }
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Moves the engine clock forward; earlier times are ignored
    pub fn advance_to(&mut self, time: f64) {
        if time > self.current_time {
            self.current_time = time;
        }
    }

    pub fn segments(&self) -> &[TransportSegment] {
        &self.segments
    }

    /// Declares a fixed-tempo regime starting at `timestamp` (default: now)
    ///
    /// Without `initial_bar_position` the new segment starts where the
    /// previous state puts the playhead at `timestamp`, so only the rate of
    /// advance changes.
    pub fn set_transport_at_time(
        &mut self,
        playing: bool,
        bpm: f64,
        beats_per_bar: u32,
        initial_bar_position: Option<f64>,
        timestamp: Option<f64>,
    ) -> Result<(), TransportError> {
        validate_tempo(bpm)?;
        validate_beats_per_bar(beats_per_bar)?;

        let timestamp = timestamp.unwrap_or(self.current_time);
        let bar = initial_bar_position.unwrap_or_else(|| self.bar_position(timestamp));
        self.insert(TransportSegment::fixed(
            timestamp,
            bar,
            beats_per_bar,
            bpm,
            playing,
        ));
        self.prune(timestamp.min(self.current_time));
        Ok(())
    }

    /// Schedules a tempo ramp; ramps may lie in the future, so nothing is pruned
    pub fn automate_tempo(
        &mut self,
        start_bpm: f64,
        start_time: f64,
        end_bpm: f64,
        end_time: f64,
        beats_per_bar: u32,
        initial_bar_position: Option<f64>,
    ) -> Result<(), TransportError> {
        validate_tempo(start_bpm)?;
        validate_tempo(end_bpm)?;
        validate_beats_per_bar(beats_per_bar)?;
        if !(end_time > start_time) {
            return Err(TransportError::InvalidRamp {
                start: start_time,
                end: end_time,
            });
        }

        let bar = initial_bar_position.unwrap_or_else(|| self.bar_position(start_time));
        self.insert(TransportSegment::ramp(
            start_time,
            bar,
            beats_per_bar,
            start_bpm,
            end_bpm,
            end_time,
        ));
        Ok(())
    }

    /// Segments relevant to `[from, to]`
    ///
    /// The head is always the single segment in effect at `from`; it is
    /// followed by every segment starting after `from` and no later than `to`.
    pub fn transport_events(&self, from: f64, to: f64) -> Vec<&TransportSegment> {
        let head = self.head_index(from);
        let mut events = vec![&self.segments[head]];
        events.extend(
            self.segments[head + 1..]
                .iter()
                .take_while(|segment| segment.start_time <= to),
        );
        events
    }

    /// Segment in effect at `time`
    pub fn segment_at(&self, time: f64) -> &TransportSegment {
        &self.segments[self.head_index(time)]
    }

    pub fn bar_position(&self, time: f64) -> f64 {
        self.segment_at(time).bar_position_at(time)
    }

    pub fn tempo_at(&self, time: f64) -> f64 {
        self.segment_at(time).tempo_at(time)
    }

    pub fn is_playing_at(&self, time: f64) -> bool {
        self.segment_at(time).playing
    }

    pub fn beats_per_bar_at(&self, time: f64) -> u32 {
        self.segment_at(time).beats_per_bar
    }

    fn head_index(&self, time: f64) -> usize {
        self.segments
            .partition_point(|segment| segment.start_time <= time)
            .saturating_sub(1)
    }

    /// Inserts after any segment with the same start time
    fn insert(&mut self, segment: TransportSegment) {
        let index = self
            .segments
            .partition_point(|existing| existing.start_time <= segment.start_time);
        self.segments.insert(index, segment);
    }

    /// Drops every segment starting at or before `horizon` except the latest
    fn prune(&mut self, horizon: f64) {
        let stale = self
            .segments
            .partition_point(|segment| segment.start_time <= horizon)
            .saturating_sub(1);
        if stale > 0 {
            self.segments.drain(..stale);
            log::debug!("Pruned {} transport segments", stale);
        }
    }
}

impl Default for TransportLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_tempo(bpm: f64) -> Result<(), TransportError> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(())
    } else {
        Err(TransportError::InvalidTempo(bpm))
    }
}

fn validate_beats_per_bar(beats_per_bar: u32) -> Result<(), TransportError> {
    if beats_per_bar == 0 {
        Err(TransportError::InvalidBeatsPerBar)
    } else {
        Ok(())
    }
}
