// Tick scheduler - Turns the continuous bar position into discrete tick crossings
// Evaluated once per render quantum on the audio thread

use super::timeline::{compute_tick, seconds_per_tick};
use super::transport::TransportLedger;

/// A tick that was crossed during one render quantum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickCrossing {
    /// Absolute tick since bar 0
    pub tick: i64,
    /// Time events for this tick are stamped with (start of the quantum)
    pub time: f64,
    pub bar_position: f64,
    pub seconds_per_tick: f64,
}

/// Fires each crossed tick exactly once
///
/// The position is sampled at the end of the quantum. When several ticks
/// elapse inside one quantum only the latest fires.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    ppqn: u32,
    last_fired_tick: Option<i64>,
}

impl TickScheduler {
    /// A zero resolution is raised to one tick per beat
    pub fn new(ppqn: u32) -> Self {
        Self {
            ppqn: ppqn.max(1),
            last_fired_tick: None,
        }
    }

    pub fn ppqn(&self) -> u32 {
        self.ppqn
    }

    pub fn last_fired_tick(&self) -> Option<i64> {
        self.last_fired_tick
    }

    /// Forget the last tick so the next evaluation fires
    pub fn reset(&mut self) {
        self.last_fired_tick = None;
    }

    /// Evaluates the quantum `[from, to)`
    ///
    /// Returns `None` while the transport is stopped (and re-arms, so
    /// restarting on the same tick fires it again) or when no new tick was
    /// crossed.
    pub fn on_render_quantum(
        &mut self,
        ledger: &TransportLedger,
        from: f64,
        to: f64,
    ) -> Option<TickCrossing> {
        let segment = ledger.segment_at(to);
        if !segment.playing {
            self.last_fired_tick = None;
            return None;
        }

        let bar_position = segment.bar_position_at(to);
        let tick = compute_tick(bar_position, segment.beats_per_bar, self.ppqn);
        if self.last_fired_tick == Some(tick) {
            return None;
        }
        self.last_fired_tick = Some(tick);

        Some(TickCrossing {
            tick,
            time: from,
            bar_position,
            seconds_per_tick: seconds_per_tick(segment.tempo_at(to), self.ppqn),
        })
    }
}
