// Function sequencer - User tick handlers driven by the transport at PPQN 96
// A failing or panicking handler is disabled and reported, never propagated

use crate::config::SchedulerConfig;
use crate::controller::config::ParameterDefinition;
use crate::controller::{ParameterError, ParameterHost};
use crate::messaging::channels::{NotificationProducer, report};
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::midi::ScheduledMidi;
use crate::registry::Processor;
use crate::sequencer::scheduler::TickScheduler;
use crate::sequencer::transport::{TransportLedger, TransportSegment};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),
}

/// A note requested by a handler for the current tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratedNote {
    pub note: u8,
    pub velocity: u8,
    /// Length in ticks; fractions are allowed
    pub duration: f64,
}

impl GeneratedNote {
    pub fn new(note: u8, velocity: u8, duration: f64) -> Self {
        Self {
            note,
            velocity,
            duration,
        }
    }
}

/// User-supplied sequencing logic
///
/// `on_tick` runs on the audio thread once per crossed tick; keep it cheap.
pub trait TickHandler: Send {
    /// Parameters exposed to host automation
    fn parameters(&self) -> Vec<ParameterDefinition> {
        Vec::new()
    }

    fn on_tick(
        &mut self,
        tick: i64,
        params: &ParameterHost,
    ) -> Result<Vec<GeneratedNote>, HandlerError>;

    fn on_transport_start(
        &mut self,
        _transport: &TransportSegment,
        _params: &ParameterHost,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    fn on_transport_stop(
        &mut self,
        _transport: &TransportSegment,
        _params: &ParameterHost,
    ) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Reads a registered parameter inside a handler
pub fn parameter(params: &ParameterHost, id: &str) -> Result<f64, HandlerError> {
    params
        .value(id)
        .ok_or_else(|| HandlerError::MissingParameter(id.to_string()))
}

pub struct FunctionSequencer {
    handler: Option<Box<dyn TickHandler>>,
    host: ParameterHost,
    scheduler: TickScheduler,
    note_off_lead: f64,
    was_playing: bool,
    notifications: Option<NotificationProducer>,
    last_error: Option<String>,
}

impl FunctionSequencer {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            handler: None,
            host: ParameterHost::new(),
            scheduler: TickScheduler::new(config.ppqn),
            note_off_lead: config.note_off_lead,
            was_playing: false,
            notifications: None,
            last_error: None,
        }
    }

    pub fn with_notifications(config: SchedulerConfig, notifications: NotificationProducer) -> Self {
        let mut sequencer = Self::new(config);
        sequencer.notifications = Some(notifications);
        sequencer
    }

    /// Installs a handler and registers its parameters
    ///
    /// Values of parameters that survive the swap are kept. On a bad
    /// declaration nothing changes.
    pub fn load_handler(&mut self, handler: Box<dyn TickHandler>) -> Result<(), ParameterError> {
        self.host.replace(handler.parameters())?;
        self.handler = Some(handler);
        self.last_error = None;
        self.scheduler.reset();
        Ok(())
    }

    pub fn unload_handler(&mut self) -> Option<Box<dyn TickHandler>> {
        self.handler.take()
    }

    pub fn is_active(&self) -> bool {
        self.handler.is_some()
    }

    /// Why the last handler was disabled
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn host(&self) -> &ParameterHost {
        &self.host
    }

    pub fn set_parameter(&mut self, id: &str, value: f64) -> Result<f64, ParameterError> {
        self.host.set_value(id, value)
    }

    /// Runs one handler callback, disabling the handler on error or panic
    fn guarded<T>(
        &mut self,
        context: &str,
        call: impl FnOnce(&mut Box<dyn TickHandler>, &ParameterHost) -> Result<T, HandlerError>,
    ) -> Option<T> {
        let handler = self.handler.as_mut()?;
        let host = &self.host;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(handler, host)));

        let message = match outcome {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(err)) => format!("Error in {}: {}", context, err),
            Err(payload) => format!("Panic in {}: {}", context, panic_message(payload.as_ref())),
        };
        self.disable(message);
        None
    }

    fn disable(&mut self, message: String) {
        self.handler = None;
        report(
            self.notifications.as_mut(),
            Notification::error(NotificationCategory::Scheduler, message.clone()),
        );
        self.last_error = Some(message);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

impl Processor for FunctionSequencer {
    fn process(
        &mut self,
        ledger: &TransportLedger,
        from: f64,
        to: f64,
        output: &mut Vec<ScheduledMidi>,
    ) {
        let segment = *ledger.segment_at(to);
        if segment.playing != self.was_playing {
            self.was_playing = segment.playing;
            if segment.playing {
                self.guarded("on_transport_start", |h, p| h.on_transport_start(&segment, p));
            } else {
                self.guarded("on_transport_stop", |h, p| h.on_transport_stop(&segment, p));
            }
        }

        if self.handler.is_none() {
            return;
        }
        let Some(crossing) = self.scheduler.on_render_quantum(ledger, from, to) else {
            return;
        };
        let Some(notes) = self.guarded("on_tick", |h, p| h.on_tick(crossing.tick, p)) else {
            return;
        };

        for note in notes {
            output.push(ScheduledMidi::note_on(crossing.time, note.note, note.velocity));
            output.push(ScheduledMidi::note_off(
                crossing.time + note.duration * crossing.seconds_per_tick - self.note_off_lead,
                note.note,
                note.velocity,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::config::ParameterConfig;
    use crate::messaging::channels::create_notification_channel;
    use crate::messaging::notification::NotificationLevel;
    use ringbuf::traits::Consumer;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    const QUANTUM: f64 = 128.0 / 48000.0;

    /// One note per beat, pitch from the "note" parameter
    #[derive(Default)]
    struct BeatPulse {
        starts: Arc<AtomicU32>,
        stops: Arc<AtomicU32>,
    }

    impl TickHandler for BeatPulse {
        fn parameters(&self) -> Vec<ParameterDefinition> {
            vec![
                ParameterDefinition::new(
                    "note",
                    ParameterConfig::Int {
                        label: Some("Note".into()),
                        default_value: 60,
                        min_value: 0,
                        max_value: 127,
                    },
                )
                .unwrap(),
            ]
        }

        fn on_tick(
            &mut self,
            tick: i64,
            params: &ParameterHost,
        ) -> Result<Vec<GeneratedNote>, HandlerError> {
            if tick % 96 != 0 {
                return Ok(Vec::new());
            }
            let note = parameter(params, "note")? as u8;
            Ok(vec![GeneratedNote::new(note, 100, 48.0)])
        }

        fn on_transport_start(
            &mut self,
            _transport: &TransportSegment,
            _params: &ParameterHost,
        ) -> Result<(), HandlerError> {
            self.starts.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn on_transport_stop(
            &mut self,
            _transport: &TransportSegment,
            _params: &ParameterHost,
        ) -> Result<(), HandlerError> {
            self.stops.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    struct FailsAt(i64);

    impl TickHandler for FailsAt {
        fn on_tick(&mut self, tick: i64, _: &ParameterHost) -> Result<Vec<GeneratedNote>, HandlerError> {
            if tick >= self.0 {
                Err(HandlerError::Failed("boom".into()))
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct Panics;

    impl TickHandler for Panics {
        fn on_tick(&mut self, _: i64, _: &ParameterHost) -> Result<Vec<GeneratedNote>, HandlerError> {
            panic!("handler bug");
        }
    }

    fn playing() -> TransportLedger {
        let mut ledger = TransportLedger::new();
        ledger
            .set_transport_at_time(true, 120.0, 4, Some(0.0), Some(0.0))
            .unwrap();
        ledger
    }

    fn run(sequencer: &mut FunctionSequencer, ledger: &TransportLedger, quanta: usize) -> Vec<ScheduledMidi> {
        let mut output = Vec::new();
        for i in 0..quanta {
            let from = i as f64 * QUANTUM;
            sequencer.process(ledger, from, from + QUANTUM, &mut output);
        }
        output
    }

    #[test]
    fn test_handler_notes_are_scheduled() {
        let mut sequencer = FunctionSequencer::new(SchedulerConfig::function_sequencer());
        sequencer.load_handler(Box::new(BeatPulse::default())).unwrap();
        sequencer.set_parameter("note", 200.0).unwrap();

        // ~1.1 beats: ticks 0 and 96 both land on a beat
        let events = run(&mut sequencer, &playing(), 210);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].bytes, [0x90, 127, 100]);
        // 48 ticks at 120 BPM / PPQN 96 = 0.25s
        assert!((events[1].time - (0.25 - 0.001)).abs() < 1e-9);
        assert_eq!(events[1].bytes, [0x80, 127, 100]);
    }

    #[test]
    fn test_transport_edges() {
        let handler = BeatPulse::default();
        let starts = handler.starts.clone();
        let stops = handler.stops.clone();
        let mut sequencer = FunctionSequencer::new(SchedulerConfig::function_sequencer());
        sequencer.load_handler(Box::new(handler)).unwrap();

        let mut ledger = playing();
        run(&mut sequencer, &ledger, 4);
        assert_eq!(starts.load(Ordering::Relaxed), 1);

        ledger.advance_to(1.0);
        ledger.set_transport_at_time(false, 120.0, 4, None, None).unwrap();
        let mut output = Vec::new();
        sequencer.process(&ledger, 1.0, 1.0 + QUANTUM, &mut output);
        sequencer.process(&ledger, 1.1, 1.1 + QUANTUM, &mut output);
        assert!(output.is_empty());
        assert_eq!(stops.load(Ordering::Relaxed), 1);
        assert_eq!(starts.load(Ordering::Relaxed), 1);

        ledger.advance_to(2.0);
        ledger.set_transport_at_time(true, 120.0, 4, None, None).unwrap();
        sequencer.process(&ledger, 2.0, 2.0 + QUANTUM, &mut output);
        assert_eq!(starts.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_error_disables_handler_and_notifies() {
        let (tx, mut rx) = create_notification_channel(4);
        let mut sequencer =
            FunctionSequencer::with_notifications(SchedulerConfig::function_sequencer(), tx);
        sequencer.load_handler(Box::new(FailsAt(3))).unwrap();

        run(&mut sequencer, &playing(), 40);
        assert!(!sequencer.is_active());
        assert_eq!(sequencer.last_error(), Some("Error in on_tick: boom"));

        let notification = rx.try_pop().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(notification.category, NotificationCategory::Scheduler);
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_panic_is_contained() {
        let mut sequencer = FunctionSequencer::new(SchedulerConfig::function_sequencer());
        sequencer.load_handler(Box::new(Panics)).unwrap();

        let events = run(&mut sequencer, &playing(), 10);
        assert!(events.is_empty());
        assert!(!sequencer.is_active());
        assert_eq!(sequencer.last_error(), Some("Panic in on_tick: handler bug"));
    }

    #[test]
    fn test_reload_keeps_parameter_values() {
        let mut sequencer = FunctionSequencer::new(SchedulerConfig::function_sequencer());
        sequencer.load_handler(Box::new(BeatPulse::default())).unwrap();
        sequencer.set_parameter("note", 72.0).unwrap();

        sequencer.load_handler(Box::new(BeatPulse::default())).unwrap();
        assert_eq!(sequencer.host().value("note"), Some(72.0));

        sequencer.load_handler(Box::new(Panics)).unwrap();
        assert!(sequencer.host().is_empty());
    }

    #[test]
    fn test_missing_parameter_is_an_error() {
        let host = ParameterHost::new();
        assert_eq!(
            parameter(&host, "rate"),
            Err(HandlerError::MissingParameter("rate".into()))
        );
    }
}
