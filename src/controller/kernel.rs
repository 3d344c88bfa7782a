// Controller kernel - a device's full parameter set behind one interface
// Kernels fan host updates out to parameters and inbound MIDI back in

use super::config::ParameterDefinition;
use super::parameter::{AutomationEvent, SynthParameter};
use crate::midi::{MidiBytes, MidiChannel};
use std::collections::HashMap;

/// Ordered parameter collection with lookup by id
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    parameters: Vec<SynthParameter>,
    index: HashMap<String, usize>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parameter: SynthParameter) {
        assert!(
            !self.index.contains_key(parameter.id()),
            "Duplicate parameter id {}",
            parameter.id()
        );
        self.index
            .insert(parameter.id().to_string(), self.parameters.len());
        self.parameters.push(parameter);
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SynthParameter> {
        self.index.get(id).map(|&i| &self.parameters[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SynthParameter> {
        self.index.get(id).map(|&i| &mut self.parameters[i])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SynthParameter> {
        self.parameters.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SynthParameter> {
        self.parameters.iter_mut()
    }

    pub fn definitions(&self) -> Vec<ParameterDefinition> {
        self.parameters.iter().map(|p| p.to_wam()).collect()
    }

    /// Offers a message to each parameter until one ingests it
    pub fn ingest_midi(&mut self, channel: MidiChannel, bytes: &[u8]) -> bool {
        self.parameters
            .iter_mut()
            .any(|p| p.ingest_midi(channel, bytes))
    }

    /// Applies host values; true if any parameter changed
    pub fn parameter_update(&mut self, values: &HashMap<String, i32>) -> bool {
        let mut changed = false;
        for (id, value) in values {
            if let Some(parameter) = self.get_mut(id) {
                changed |= parameter.parameter_update(*value);
            }
        }
        changed
    }

    pub fn automation_messages(&mut self, force: bool) -> Vec<AutomationEvent> {
        self.parameters
            .iter_mut()
            .filter_map(|p| p.automation_message(force))
            .collect()
    }

    pub fn midi_messages(&mut self, channel: MidiChannel, force: bool) -> Vec<MidiBytes> {
        self.parameters
            .iter_mut()
            .flat_map(|p| p.midi_message(channel, force))
            .collect()
    }

    pub fn sysex_needed(&self) -> bool {
        self.parameters.iter().any(|p| p.sysex_needed())
    }

    pub fn mark_transmitted(&mut self) {
        for parameter in &mut self.parameters {
            parameter.mark_transmitted();
        }
    }
}

impl FromIterator<SynthParameter> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = SynthParameter>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for parameter in iter {
            set.push(parameter);
        }
        set
    }
}

/// A MIDI device model: parameters plus optional bulk dump support
///
/// Implementors provide parameter access; the per-message plumbing has
/// default implementations over the shared [`ParameterSet`].
pub trait ControllerKernel: Send {
    fn parameters(&self) -> &ParameterSet;

    fn parameters_mut(&mut self) -> &mut ParameterSet;

    /// Channel the device listens on
    fn channel(&self) -> MidiChannel;

    fn set_channel(&mut self, channel: MidiChannel);

    fn wam_parameters(&self) -> Vec<ParameterDefinition> {
        self.parameters().definitions()
    }

    /// Returns true if some parameter consumed the message
    fn ingest_midi(&mut self, bytes: &[u8]) -> bool {
        let channel = self.channel();
        self.parameters_mut().ingest_midi(channel, bytes)
    }

    fn parameter_update(&mut self, values: &HashMap<String, i32>) -> bool {
        self.parameters_mut().parameter_update(values)
    }

    fn automation_messages(&mut self, force: bool) -> Vec<AutomationEvent> {
        self.parameters_mut().automation_messages(force)
    }

    fn midi_messages(&mut self, channel: MidiChannel, force: bool) -> Vec<MidiBytes> {
        self.parameters_mut().midi_messages(channel, force)
    }

    /// True when a pending change has to go out as a bulk dump
    fn sysex_needed(&self) -> bool {
        self.parameters().sysex_needed()
    }

    /// Full program dump, if the device supports one
    fn to_sysex(&self) -> Option<Vec<u8>> {
        None
    }

    /// Loads a program dump; false if the frame is not one of ours
    fn from_sysex(&mut self, _data: &[u8]) -> bool {
        false
    }

    /// Marks pending changes as sent after a bulk dump went out
    fn sysex_sent(&mut self) {
        self.parameters_mut().mark_transmitted();
    }
}

/// Kernel for devices controlled purely by CC/NRPN
#[derive(Debug, Clone)]
pub struct CcKernel {
    parameters: ParameterSet,
    channel: MidiChannel,
}

impl CcKernel {
    pub fn new(parameters: ParameterSet, channel: MidiChannel) -> Self {
        Self {
            parameters,
            channel,
        }
    }
}

impl ControllerKernel for CcKernel {
    fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    fn channel(&self) -> MidiChannel {
        self.channel
    }

    fn set_channel(&mut self, channel: MidiChannel) {
        self.channel = channel;
    }
}
