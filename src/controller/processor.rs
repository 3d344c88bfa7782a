// Controller processor - drives a kernel from host automation and device MIDI
// Local changes go out as MIDI (or a debounced program dump); device changes
// come back as automation events

use super::ParameterError;
use super::host::ParameterHost;
use super::kernel::ControllerKernel;
use super::parameter::AutomationEvent;
use crate::messaging::channels::{NotificationProducer, report};
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::midi::event::is_note_message;
use crate::midi::{MidiBytes, MidiChannel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which inbound MIDI the processor forwards when no parameter consumed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MidiPassThrough {
    Off,
    Notes,
    #[default]
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub channel: MidiChannel,
    pub midi_pass_through: MidiPassThrough,
    /// Seconds to wait after the last bulk-only change before dumping
    pub sysex_debounce: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            channel: MidiChannel::new(1),
            midi_pass_through: MidiPassThrough::All,
            sysex_debounce: 0.2,
        }
    }
}

/// Something the processor wants delivered at `time`
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    Midi { time: f64, bytes: MidiBytes },
    Sysex { time: f64, bytes: Vec<u8> },
    Automation { time: f64, event: AutomationEvent },
}

impl OutboundEvent {
    pub fn time(&self) -> f64 {
        match self {
            OutboundEvent::Midi { time, .. }
            | OutboundEvent::Sysex { time, .. }
            | OutboundEvent::Automation { time, .. } => *time,
        }
    }
}

pub struct ControllerProcessor {
    kernel: Box<dyn ControllerKernel>,
    config: ControllerConfig,
    host: ParameterHost,
    sysex_due: Option<f64>,
    notifications: Option<NotificationProducer>,
}

impl ControllerProcessor {
    pub fn new(
        mut kernel: Box<dyn ControllerKernel>,
        config: ControllerConfig,
    ) -> Result<Self, ParameterError> {
        kernel.set_channel(config.channel);
        let mut host = ParameterHost::with_definitions(kernel.wam_parameters())?;
        for parameter in kernel.parameters().iter() {
            host.set_value(parameter.id(), parameter.value() as f64)?;
        }

        Ok(Self {
            kernel,
            config,
            host,
            sysex_due: None,
            notifications: None,
        })
    }

    /// Reports dump activity to the control thread from now on
    pub fn set_notifications(&mut self, notifications: NotificationProducer) {
        self.notifications = Some(notifications);
    }

    pub fn kernel(&self) -> &dyn ControllerKernel {
        self.kernel.as_ref()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ControllerConfig) {
        self.kernel.set_channel(config.channel);
        self.config = config;
    }

    /// Host-side parameter values
    pub fn host(&self) -> &ParameterHost {
        &self.host
    }

    /// Host automation write; picked up on the next `process`
    pub fn set_parameter(&mut self, id: &str, value: f64) -> Result<f64, ParameterError> {
        self.host.set_value(id, value)
    }

    /// Time the pending program dump goes out, if one is scheduled
    pub fn sysex_due(&self) -> Option<f64> {
        self.sysex_due
    }

    /// Schedules a full program dump (e.g. the UI "send" button)
    pub fn request_dump(&mut self, now: f64) {
        self.sysex_due = Some(now + self.config.sysex_debounce);
    }

    /// Runs once per render quantum
    pub fn process(&mut self, now: f64) -> Vec<OutboundEvent> {
        let mut events = Vec::new();

        let values: HashMap<String, i32> = self
            .host
            .iter()
            .map(|(id, value)| (id.to_string(), value.round() as i32))
            .collect();

        if self.kernel.parameter_update(&values) {
            if self.kernel.sysex_needed() {
                self.request_dump(now);
            } else {
                let channel = self.kernel.channel();
                events.extend(
                    self.kernel
                        .midi_messages(channel, false)
                        .into_iter()
                        .map(|bytes| OutboundEvent::Midi { time: now, bytes }),
                );
            }
        }

        if let Some(due) = self.sysex_due {
            if now >= due {
                self.sysex_due = None;
                if let Some(bytes) = self.kernel.to_sysex() {
                    self.kernel.sysex_sent();
                    events.push(OutboundEvent::Sysex { time: now, bytes });
                } else {
                    self.report(Notification::warning(
                        NotificationCategory::Controller,
                        "Program dump requested but the kernel has no SysEx support",
                    ));
                }
            }
        }

        events
    }

    /// Inbound channel message from the device
    pub fn on_midi(&mut self, now: f64, bytes: &[u8]) -> Vec<OutboundEvent> {
        if self.kernel.ingest_midi(bytes) {
            return self.automation_events(now);
        }

        let forward = match self.config.midi_pass_through {
            MidiPassThrough::Off => false,
            MidiPassThrough::Notes => is_note_message(bytes),
            MidiPassThrough::All => true,
        };

        match bytes {
            [a, b, c, ..] if forward => vec![OutboundEvent::Midi {
                time: now,
                bytes: [*a, *b, *c],
            }],
            _ => Vec::new(),
        }
    }

    /// Inbound SysEx from the device
    pub fn on_sysex(&mut self, now: f64, bytes: &[u8]) -> Vec<OutboundEvent> {
        if self.kernel.from_sysex(bytes) {
            let events = self.automation_events(now);
            self.report(Notification::info(
                NotificationCategory::Sysex,
                format!("Program dump loaded, {} parameters changed", events.len()),
            ));
            return events;
        }

        if self.config.midi_pass_through == MidiPassThrough::Off {
            return Vec::new();
        }
        vec![OutboundEvent::Sysex {
            time: now,
            bytes: bytes.to_vec(),
        }]
    }

    fn report(&mut self, notification: Notification) {
        report(self.notifications.as_mut(), notification);
    }

    /// Device-side changes become automation and are mirrored into the
    /// host values so the next `process` does not send them back
    fn automation_events(&mut self, now: f64) -> Vec<OutboundEvent> {
        self.kernel
            .automation_messages(false)
            .into_iter()
            .map(|event| {
                if let Err(err) = self.host.set_value(&event.id, event.value as f64) {
                    log::warn!("automation for unregistered parameter: {}", err);
                }
                OutboundEvent::Automation { time: now, event }
            })
            .collect()
    }
}
