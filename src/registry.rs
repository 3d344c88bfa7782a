// Processor registry - Instance-id keyed processors for one engine
// Built by the engine owner and handed to whoever needs lookups

use crate::midi::{MidiBytes, ScheduledMidi};
use crate::sequencer::transport::TransportLedger;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Processor id must not be empty")]
    EmptyId,

    #[error("Processor already registered: {0}")]
    DuplicateId(String),
}

/// Something that produces timed MIDI once per render quantum
pub trait Processor: Send {
    /// Renders `[from, to)` against the shared transport
    fn process(
        &mut self,
        ledger: &TransportLedger,
        from: f64,
        to: f64,
        output: &mut Vec<ScheduledMidi>,
    );

    /// Upstream MIDI; forwarded unchanged unless the processor consumes it
    fn on_midi(&mut self, time: f64, bytes: MidiBytes, output: &mut Vec<ScheduledMidi>) {
        output.push(ScheduledMidi::new(time, bytes));
    }
}

/// Processors of one engine instance, in registration order
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: Vec<(String, Box<dyn Processor>)>,
    index: HashMap<String, usize>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        id: impl Into<String>,
        processor: Box<dyn Processor>,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if self.index.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }

        self.index.insert(id.clone(), self.processors.len());
        self.processors.push((id, processor));
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Box<dyn Processor>> {
        let position = self.index.remove(id)?;
        let (_, processor) = self.processors.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(processor)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&dyn Processor> {
        self.index
            .get(id)
            .map(|&i| self.processors[i].1.as_ref())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut (dyn Processor + 'static)> {
        let &i = self.index.get(id)?;
        Some(self.processors[i].1.as_mut())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.processors.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Runs every processor for one quantum, handing each event to `sink`
    pub fn render_quantum<F>(&mut self, ledger: &TransportLedger, from: f64, to: f64, mut sink: F)
    where
        F: FnMut(&str, ScheduledMidi),
    {
        let mut output = Vec::new();
        for (id, processor) in &mut self.processors {
            output.clear();
            processor.process(ledger, from, to, &mut output);
            for event in output.drain(..) {
                sink(id.as_str(), event);
            }
        }
    }
}
