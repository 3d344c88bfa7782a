// Timeline - Tick resolution constants and bar/tick conversions
// Positions come from the transport ledger as fractional bars; ticks are derived

use std::fmt;

/// Piano roll resolution (pulses per quarter note)
pub const PIANO_ROLL_PPQN: u32 = 24;

/// Function sequencer resolution
pub const FUNCTION_SEQ_PPQN: u32 = 96;

/// One sixteenth step at piano roll resolution
pub const STEP_TICKS: u32 = PIANO_ROLL_PPQN / 4;

/// Default clip length: 16 sixteenth steps
pub const DEFAULT_CLIP_TICKS: u32 = STEP_TICKS * 16;

/// Discrete tick for a fractional bar position
///
/// `floor(bar_position * beats_per_bar * ppqn)`. Negative positions floor
/// towards negative infinity so tick order matches time order.
pub fn compute_tick(bar_position: f64, beats_per_bar: u32, ppqn: u32) -> i64 {
    (bar_position * beats_per_bar as f64 * ppqn as f64).floor() as i64
}

/// Length of one tick in seconds at a given tempo
pub fn seconds_per_tick(bpm: f64, ppqn: u32) -> f64 {
    1.0 / ((bpm / 60.0) * ppqn as f64)
}

/// Bar/beat/tick breakdown of a position, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MusicalTime {
    pub bar: u32,  // Bar number (1-based)
    pub beat: u32, // Beat within bar (1-based)
    pub tick: u32, // Tick within beat (0-based)
}

impl MusicalTime {
    pub fn new(bar: u32, beat: u32, tick: u32) -> Self {
        assert!(bar >= 1, "Bar is 1-based");
        assert!(beat >= 1, "Beat is 1-based");
        Self { bar, beat, tick }
    }

    /// Bar 1, beat 1, tick 0
    pub fn zero() -> Self {
        Self::new(1, 1, 0)
    }

    /// Total ticks from the start of bar 1
    pub fn to_total_ticks(&self, beats_per_bar: u32, ppqn: u32) -> u64 {
        let ticks_per_bar = beats_per_bar as u64 * ppqn as u64;
        (self.bar - 1) as u64 * ticks_per_bar + (self.beat - 1) as u64 * ppqn as u64
            + self.tick as u64
    }

    pub fn from_total_ticks(total_ticks: u64, beats_per_bar: u32, ppqn: u32) -> Self {
        assert!(beats_per_bar > 0 && ppqn > 0, "Resolution must be positive");
        let ticks_per_bar = beats_per_bar as u64 * ppqn as u64;

        let bar = total_ticks / ticks_per_bar + 1;
        let in_bar = total_ticks % ticks_per_bar;
        let beat = in_bar / ppqn as u64 + 1;
        let tick = in_bar % ppqn as u64;

        Self::new(bar as u32, beat as u32, tick as u32)
    }

    /// Breakdown of a ledger bar position (bar 0.0 is "1:01:000")
    ///
    /// Positions before the start clamp to zero.
    pub fn from_bar_position(bar_position: f64, beats_per_bar: u32, ppqn: u32) -> Self {
        let tick = compute_tick(bar_position, beats_per_bar, ppqn).max(0);
        Self::from_total_ticks(tick as u64, beats_per_bar, ppqn)
    }
}

impl Default for MusicalTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for MusicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:03}", self.bar, self.beat, self.tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_tick() {
        assert_eq!(compute_tick(0.0, 4, 24), 0);
        assert_eq!(compute_tick(1.0, 4, 24), 96);
        assert_eq!(compute_tick(0.2499, 4, 96), 95);
        assert_eq!(compute_tick(-0.001, 4, 24), -1);
    }

    #[test]
    fn test_seconds_per_tick() {
        // 120 BPM: a beat is 0.5s
        assert!((seconds_per_tick(120.0, 24) - 0.5 / 24.0).abs() < 1e-12);
        assert!((seconds_per_tick(60.0, 96) - 1.0 / 96.0).abs() < 1e-12);
    }

    #[test]
    fn test_constants() {
        assert_eq!(STEP_TICKS, 6);
        assert_eq!(DEFAULT_CLIP_TICKS, 96);
    }

    #[test]
    fn test_musical_time_conversion() {
        assert_eq!(MusicalTime::new(1, 1, 0).to_total_ticks(4, 24), 0);
        assert_eq!(MusicalTime::new(1, 2, 0).to_total_ticks(4, 24), 24);
        assert_eq!(MusicalTime::new(2, 1, 0).to_total_ticks(4, 24), 96);
        assert_eq!(MusicalTime::new(2, 1, 0).to_total_ticks(3, 24), 72);

        let time = MusicalTime::from_total_ticks(1000, 4, 96);
        assert_eq!(time, MusicalTime::new(3, 3, 40));
        assert_eq!(time.to_total_ticks(4, 96), 1000);
    }

    #[test]
    fn test_from_bar_position() {
        assert_eq!(MusicalTime::from_bar_position(0.0, 4, 24), MusicalTime::zero());
        assert_eq!(MusicalTime::from_bar_position(1.5, 4, 24), MusicalTime::new(2, 3, 0));
        assert_eq!(MusicalTime::from_bar_position(-2.0, 4, 24), MusicalTime::zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(MusicalTime::zero().to_string(), "1:01:000");
        assert_eq!(MusicalTime::new(12, 3, 7).to_string(), "12:03:007");
    }
}
