//! Transport and scheduling integration tests
//!
//! Drives the ledger, the tick scheduler and the note-producing processors
//! the way an audio callback does: fixed 128-frame quanta at 48kHz.

use rand::Rng;
use ringbuf::traits::{Consumer, Producer};
use sequencer_party::controller::config::{ParameterConfig, ParameterDefinition};
use sequencer_party::messaging::{NotificationLevel, drain_notifications};
use sequencer_party::sequencer::function::parameter;
use sequencer_party::sequencer::{
    GeneratedNote, HandlerError, STEP_TICKS, TickHandler, TransportSegment,
};
use sequencer_party::{
    Chorder, FunctionSequencer, ParameterHost, PatternStore, PianoRollProcessor, Processor,
    ProcessorMessage, ProcessorRegistry, ScheduledMidi, SchedulerConfig, TickScheduler,
    TransportLedger, create_message_channel, create_notification_channel,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

const QUANTUM: f64 = 128.0 / 48000.0;
const EPSILON: f64 = 1e-9;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {}, got {}",
        expected,
        actual
    );
}

fn playing_at_120() -> TransportLedger {
    let mut ledger = TransportLedger::new();
    ledger
        .set_transport_at_time(true, 120.0, 4, Some(0.0), Some(0.0))
        .unwrap();
    ledger
}

fn quantum(i: usize) -> (f64, f64) {
    let from = i as f64 * QUANTUM;
    (from, from + QUANTUM)
}

#[test]
fn test_tempo_change_keeps_playhead_continuous() {
    init_logging();
    let mut ledger = playing_at_120();
    assert_close(ledger.bar_position(2.0), 1.0);

    ledger.advance_to(1.0);
    ledger
        .set_transport_at_time(true, 60.0, 4, None, None)
        .unwrap();

    assert_eq!(ledger.segments().len(), 1);
    assert_close(ledger.bar_position(1.0), 0.5);
    // one beat per second from here
    assert_close(ledger.bar_position(3.0), 1.0);
    assert_close(ledger.tempo_at(2.0), 60.0);
}

#[test]
fn test_random_tempo_changes_are_continuous() {
    init_logging();
    let mut rng = rand::thread_rng();
    let mut ledger = playing_at_120();
    let mut time = 0.0;

    for _ in 0..50 {
        time += rng.gen_range(0.05..2.0);
        let before = ledger.bar_position(time);
        ledger.advance_to(time);
        ledger
            .set_transport_at_time(
                true,
                rng.gen_range(30.0..300.0),
                rng.gen_range(1..=7),
                None,
                None,
            )
            .unwrap();
        assert!((ledger.bar_position(time) - before).abs() < 1e-6);
        assert!(ledger.segments().len() <= 2);
    }
}

#[test]
fn test_ramp_integrates_tempo() {
    let mut ledger = TransportLedger::new();
    ledger
        .automate_tempo(60.0, 0.0, 120.0, 4.0, 4, Some(0.0))
        .unwrap();

    assert_close(ledger.tempo_at(2.0), 90.0);
    // 60 -> 120 BPM over 4 seconds averages 90 BPM: 6 beats
    assert_close(ledger.bar_position(4.0), 1.5);
    // then holds 120 BPM
    assert_close(ledger.bar_position(6.0), 2.5);
    assert_close(ledger.tempo_at(10.0), 120.0);
}

#[test]
fn test_stopped_transport_keeps_advancing() {
    let mut ledger = playing_at_120();
    ledger.advance_to(2.0);
    ledger
        .set_transport_at_time(false, 120.0, 4, None, None)
        .unwrap();
    assert!(!ledger.is_playing_at(3.0));
    assert_close(ledger.bar_position(2.0), 1.0);
    assert_close(ledger.bar_position(3.5), 1.75);
    assert_close(ledger.bar_position(4.0), 2.0);

    // a restart without a position picks up where the stopped clock is
    let mut resumed = ledger.clone();
    resumed
        .set_transport_at_time(true, 120.0, 4, None, Some(4.0))
        .unwrap();
    assert_close(resumed.bar_position(6.0), 3.0);

    // hosts that rewind pass the position explicitly
    ledger
        .set_transport_at_time(true, 120.0, 4, Some(1.0), Some(4.0))
        .unwrap();
    assert_close(ledger.bar_position(4.0), 1.0);
    assert_close(ledger.bar_position(6.0), 2.0);

    let events = ledger.transport_events(3.0, 5.0);
    assert_eq!(events.len(), 2);
    assert!(!events[0].playing);
    assert_close(events[0].bar_position_at(3.0), 1.5);
    assert!(events[1].playing);
}

#[test]
fn test_ticks_fire_consecutively_under_tempo_changes() {
    let mut rng = rand::thread_rng();
    let mut ledger = playing_at_120();
    let mut scheduler = TickScheduler::new(24);
    let mut fired = Vec::new();
    let mut next_change = 0.5;

    for i in 0..20_000 {
        let (from, to) = quantum(i);
        if from >= next_change {
            ledger.advance_to(from);
            ledger
                .set_transport_at_time(true, rng.gen_range(40.0..240.0), 4, None, None)
                .unwrap();
            next_change += rng.gen_range(0.1..1.5);
        }
        if let Some(crossing) = scheduler.on_render_quantum(&ledger, from, to) {
            assert_eq!(crossing.time, from);
            fired.push(crossing.tick);
        }
    }

    // at most 240 BPM a quantum is shorter than a tick, so none are skipped
    assert_eq!(fired[0], 0);
    for pair in fired.windows(2) {
        assert_eq!(pair[1], pair[0] + 1);
    }
}

#[test]
fn test_piano_roll_loops_clip_through_registry() {
    init_logging();
    let (mut tx, rx) = create_message_channel(16);
    let (notify_tx, mut notify_rx) = create_notification_channel(16);

    let mut registry = ProcessorRegistry::new();
    registry
        .register(
            "roll",
            Box::new(PianoRollProcessor::with_channels(
                SchedulerConfig::piano_roll(),
                rx,
                notify_tx,
            )),
        )
        .unwrap();

    // one beat of sixteenths
    let mut clip = PatternStore::with_id("verse");
    clip.set_length(24).unwrap();
    for (step, number) in [60u8, 62, 64, 65].iter().enumerate() {
        clip.add_note(step as u32 * STEP_TICKS, *number, 3, 100);
    }
    tx.try_push(clip.clip_message()).unwrap();
    tx.try_push(ProcessorMessage::Play { id: "verse".into() })
        .unwrap();

    let ledger = playing_at_120();
    let mut events: Vec<ScheduledMidi> = Vec::new();
    // just under one second: two passes through the clip
    for i in 0..370 {
        let (from, to) = quantum(i);
        registry.render_quantum(&ledger, from, to, |id, event| {
            assert_eq!(id, "roll");
            events.push(event);
        });
    }
    assert!(notify_rx.try_pop().is_none());

    let note_ons: Vec<&ScheduledMidi> = events.iter().filter(|e| e.bytes[0] == 0x90).collect();
    let pitches: Vec<u8> = note_ons.iter().map(|e| e.bytes[1]).collect();
    assert_eq!(pitches, vec![60, 62, 64, 65, 60, 62, 64, 65]);

    // each note-on lands in the quantum where its tick begins
    let tick_seconds = 0.5 / 24.0;
    for (k, event) in note_ons.iter().enumerate() {
        let tick_time = (k as u32 * STEP_TICKS) as f64 * tick_seconds;
        assert!(event.time <= tick_time + EPSILON);
        assert!(tick_time - event.time <= QUANTUM + EPSILON);
    }

    // every note-on is followed by its release three ticks later, minus 1ms
    for pair in events.chunks(2) {
        assert_eq!(pair[1].bytes, [0x80, pair[0].bytes[1], 100]);
        assert_close(pair[1].time - pair[0].time, 3.0 * tick_seconds - 0.001);
    }
}

#[test]
fn test_long_quantum_plays_only_the_latest_tick() {
    init_logging();
    let (mut tx, rx) = create_message_channel(4);
    let (notify_tx, mut notify_rx) = create_notification_channel(4);
    let mut processor =
        PianoRollProcessor::with_channels(SchedulerConfig::piano_roll(), rx, notify_tx);

    let mut clip = PatternStore::with_id("run");
    for (tick, number) in [(3u32, 59u8), (4, 60), (5, 62), (6, 64), (7, 65)] {
        clip.add_note(tick, number, 2, 100);
    }
    tx.try_push(clip.clip_message()).unwrap();
    tx.try_push(ProcessorMessage::Play { id: "run".into() })
        .unwrap();

    // a tick lasts 1/48 s at 120 BPM and PPQN 24
    let tick_seconds = 0.5 / 24.0;
    let ledger = playing_at_120();
    let mut first = Vec::new();
    processor.process(&ledger, 0.0, 0.07, &mut first);
    assert_eq!(first[0].bytes, [0x90, 59, 100]);
    assert_eq!(first.len(), 2);

    // ticks 4 to 7 all elapse inside this quantum
    let mut output = Vec::new();
    processor.process(&ledger, 0.07, 0.15, &mut output);
    let bytes: Vec<[u8; 3]> = output.iter().map(|e| e.bytes).collect();
    assert_eq!(bytes, vec![[0x90, 65, 100], [0x80, 65, 100]]);
    assert_eq!(output[0].time, 0.07);
    assert_close(output[1].time, 0.07 + 2.0 * tick_seconds - 0.001);

    // tick 7 is not played twice
    let mut after = Vec::new();
    processor.process(&ledger, 0.15, 0.15 + QUANTUM, &mut after);
    assert!(after.is_empty());
    assert!(drain_notifications(&mut notify_rx).is_empty());
}

#[test]
fn test_piano_roll_output_through_chorder() {
    let mut registry = ProcessorRegistry::new();
    let mut roll = PianoRollProcessor::new(SchedulerConfig::piano_roll());
    let mut clip = PatternStore::with_id("a");
    clip.add_note(0, 48, 6, 90);
    roll.handle_message(clip.clip_message());
    roll.handle_message(ProcessorMessage::Play { id: "a".into() });
    registry.register("roll", Box::new(roll)).unwrap();

    let mut chorder = Chorder::new().unwrap();
    chorder.set_parameter("offset1", 4.0).unwrap();
    chorder.set_parameter("offset2", 7.0).unwrap();
    registry.register("chorder", Box::new(chorder)).unwrap();

    let ledger = playing_at_120();
    let mut upstream = Vec::new();
    registry.render_quantum(&ledger, 0.0, QUANTUM, |id, event| {
        if id == "roll" {
            upstream.push(event);
        }
    });
    assert_eq!(upstream.len(), 2);

    let chorder = registry.get_mut("chorder").unwrap();
    let mut output = Vec::new();
    for event in upstream {
        chorder.on_midi(event.time, event.bytes, &mut output);
    }
    let bytes: Vec<[u8; 3]> = output.iter().map(|e| e.bytes).collect();
    assert_eq!(
        bytes,
        vec![
            [0x90, 48, 90],
            [0x90, 52, 90],
            [0x90, 55, 90],
            [0x80, 48, 90],
            [0x80, 52, 90],
            [0x80, 55, 90],
        ]
    );
}

/// Plays the "note" parameter on every beat, fails on request
struct Metronome {
    starts: Arc<AtomicU32>,
    stops: Arc<AtomicU32>,
    fail_at: Option<i64>,
}

impl Metronome {
    fn new(fail_at: Option<i64>) -> Self {
        Self {
            starts: Arc::new(AtomicU32::new(0)),
            stops: Arc::new(AtomicU32::new(0)),
            fail_at,
        }
    }
}

impl TickHandler for Metronome {
    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::new(
                "note",
                ParameterConfig::Int {
                    label: Some("Note".into()),
                    default_value: 76,
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
        if self.fail_at == Some(tick) {
            return Err(HandlerError::Failed("out of notes".into()));
        }
        if tick % 96 != 0 {
            return Ok(Vec::new());
        }
        let note = parameter(params, "note")? as u8;
        Ok(vec![GeneratedNote::new(note, 100, 12.5)])
    }

    fn on_transport_start(
        &mut self,
        _transport: &TransportSegment,
        _params: &ParameterHost,
    ) -> Result<(), HandlerError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_transport_stop(
        &mut self,
        _transport: &TransportSegment,
        _params: &ParameterHost,
    ) -> Result<(), HandlerError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_function_sequencer_plays_beats_at_96_ppqn() {
    init_logging();
    let handler = Metronome::new(None);
    let starts = handler.starts.clone();
    let stops = handler.stops.clone();

    let mut sequencer = FunctionSequencer::new(SchedulerConfig::function_sequencer());
    sequencer.load_handler(Box::new(handler)).unwrap();
    sequencer.set_parameter("note", 81.0).unwrap();

    let mut ledger = playing_at_120();
    ledger
        .set_transport_at_time(false, 120.0, 4, None, Some(2.0))
        .unwrap();

    let mut output = Vec::new();
    // 2.5 seconds: four beats, then stopped
    for i in 0..940 {
        let (from, to) = quantum(i);
        sequencer.process(&ledger, from, to, &mut output);
    }

    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    let note_ons: Vec<&ScheduledMidi> = output.iter().filter(|e| e.bytes[0] == 0x90).collect();
    assert_eq!(note_ons.len(), 4);
    assert!(note_ons.iter().all(|e| e.bytes[1] == 81));

    // 12.5 ticks at PPQN 96 and 120 BPM, minus the 1ms lead
    let expected = 12.5 * (0.5 / 96.0) - 0.001;
    for pair in output.chunks(2) {
        assert_eq!(pair[1].bytes[0], 0x80);
        assert_close(pair[1].time - pair[0].time, expected);
    }
}

#[test]
fn test_failing_handler_is_disabled_and_reported() {
    init_logging();
    let (notify_tx, mut notify_rx) = create_notification_channel(4);
    let mut sequencer =
        FunctionSequencer::with_notifications(SchedulerConfig::function_sequencer(), notify_tx);
    sequencer.load_handler(Box::new(Metronome::new(Some(100)))).unwrap();

    let ledger = playing_at_120();
    let mut output = Vec::new();
    for i in 0..375 {
        let (from, to) = quantum(i);
        sequencer.process(&ledger, from, to, &mut output);
    }

    // tick 96 played before tick 100 failed; nothing after
    assert_eq!(output.iter().filter(|e| e.bytes[0] == 0x90).count(), 2);
    assert!(!sequencer.is_active());
    assert_eq!(sequencer.last_error(), Some("Error in on_tick: out of notes"));

    let notification = notify_rx.try_pop().unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
    assert!(notify_rx.try_pop().is_none());
}
