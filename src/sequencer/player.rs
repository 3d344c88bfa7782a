// Piano roll processor - Loops the current clip against the shared transport
// Clip snapshots and play requests arrive from the control thread

use crate::config::SchedulerConfig;
use crate::messaging::channels::{MessageConsumer, NotificationProducer, report};
use crate::messaging::command::ProcessorMessage;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::midi::ScheduledMidi;
use crate::registry::Processor;
use crate::sequencer::pattern::PatternStore;
use crate::sequencer::scheduler::TickScheduler;
use crate::sequencer::transport::TransportLedger;
use ringbuf::traits::Consumer;
use std::collections::HashMap;

/// Plays `tick % clip.length` of the current clip
///
/// Each crossed tick fires the notes starting on it: a note-on at the start
/// of the quantum and a note-off `duration` ticks later, pulled ahead by the
/// configured lead so back-to-back notes retrigger.
pub struct PianoRollProcessor {
    clips: HashMap<String, PatternStore>,
    current_clip: Option<String>,
    pending_clip: Option<String>,
    scheduler: TickScheduler,
    note_off_lead: f64,
    messages: Option<MessageConsumer>,
    notifications: Option<NotificationProducer>,
}

impl PianoRollProcessor {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            clips: HashMap::new(),
            current_clip: None,
            pending_clip: None,
            scheduler: TickScheduler::new(config.ppqn),
            note_off_lead: config.note_off_lead,
            messages: None,
            notifications: None,
        }
    }

    /// Processor fed by a message queue, reporting to a notification queue
    pub fn with_channels(
        config: SchedulerConfig,
        messages: MessageConsumer,
        notifications: NotificationProducer,
    ) -> Self {
        let mut processor = Self::new(config);
        processor.messages = Some(messages);
        processor.notifications = Some(notifications);
        processor
    }

    pub fn current_clip_id(&self) -> Option<&str> {
        self.current_clip.as_deref()
    }

    pub fn clip(&self, id: &str) -> Option<&PatternStore> {
        self.clips.get(id)
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn handle_message(&mut self, message: ProcessorMessage) {
        match message {
            ProcessorMessage::Clip { id, state } => {
                match PatternStore::from_state(&state, Some(&id)) {
                    Ok(clip) => {
                        self.clips.insert(id, clip);
                    }
                    Err(err) => {
                        self.report(Notification::warning(
                            NotificationCategory::Scheduler,
                            format!("Rejected clip {}: {}", id, err),
                        ));
                    }
                }
            }
            ProcessorMessage::Play { id } => {
                self.pending_clip = Some(id);
            }
        }
    }

    fn drain_messages(&mut self) {
        while let Some(message) = self.messages.as_mut().and_then(|rx| rx.try_pop()) {
            self.handle_message(message);
        }
    }

    /// Applies a pending play request
    ///
    /// An id with no clip yet still becomes current: playback starts as soon
    /// as a clip with that id arrives.
    fn apply_pending_clip(&mut self) {
        let Some(id) = self.pending_clip.take() else {
            return;
        };
        if !self.clips.contains_key(&id) {
            self.report(Notification::warning(
                NotificationCategory::Scheduler,
                format!("Play requested for unknown clip {}", id),
            ));
        }
        self.current_clip = Some(id);
    }

    fn report(&mut self, notification: Notification) {
        report(self.notifications.as_mut(), notification);
    }
}

impl Processor for PianoRollProcessor {
    fn process(
        &mut self,
        ledger: &TransportLedger,
        from: f64,
        to: f64,
        output: &mut Vec<ScheduledMidi>,
    ) {
        self.drain_messages();
        self.apply_pending_clip();

        let Some(clip) = self.current_clip.as_ref().and_then(|id| self.clips.get(id)) else {
            return;
        };
        let Some(crossing) = self.scheduler.on_render_quantum(ledger, from, to) else {
            return;
        };

        let position = crossing.tick.rem_euclid(clip.length() as i64) as u32;
        for note in clip.notes_for_tick(position) {
            output.push(ScheduledMidi::note_on(crossing.time, note.number, note.velocity));
            output.push(ScheduledMidi::note_off(
                crossing.time + note.duration as f64 * crossing.seconds_per_tick
                    - self.note_off_lead,
                note.number,
                note.velocity,
            ));
        }
    }
}
