// Wire messengers - how a parameter value travels over MIDI
// Control change, NRPN/RPN and SysEx-only (bulk dump) encodings

use super::event::{CONTROL_CHANGE, MidiBytes, MidiChannel};

/// Data entry MSB
pub const CC_DATA_ENTRY: u8 = 6;
/// Data entry LSB
pub const CC_DATA_ENTRY_LSB: u8 = 38;
pub const CC_DATA_INCREMENT: u8 = 96;
pub const CC_DATA_DECREMENT: u8 = 97;
pub const CC_NRPN_LSB: u8 = 98;
pub const CC_NRPN_MSB: u8 = 99;
pub const CC_RPN_LSB: u8 = 100;
pub const CC_RPN_MSB: u8 = 101;

const PARAMETER_NUMBER_CCS: [u8; 8] = [
    CC_DATA_ENTRY,
    CC_DATA_ENTRY_LSB,
    CC_DATA_INCREMENT,
    CC_DATA_DECREMENT,
    CC_NRPN_LSB,
    CC_NRPN_MSB,
    CC_RPN_LSB,
    CC_RPN_MSB,
];

/// Data resolution of a (N)RPN parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NrpnResolution {
    /// 7-bit value sent as data entry MSB only
    #[default]
    Coarse,
    /// 14-bit value sent as data entry MSB then LSB
    Fine,
}

/// Addressed (N)RPN parameter
///
/// Tracks whether the last parameter-number CCs seen on the wire selected
/// this parameter, so data entry messages can be attributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NrpnMessenger {
    registered: bool,
    msb: u8,
    lsb: u8,
    resolution: NrpnResolution,
    lsb_addressed: bool,
    msb_addressed: bool,
}

impl NrpnMessenger {
    /// Parameter numbers are masked to 7 bits
    pub fn new(registered: bool, msb: u8, lsb: u8, resolution: NrpnResolution) -> Self {
        Self {
            registered,
            msb: msb & 0x7F,
            lsb: lsb & 0x7F,
            resolution,
            lsb_addressed: false,
            msb_addressed: false,
        }
    }

    fn number_ccs(&self) -> (u8, u8) {
        if self.registered {
            (CC_RPN_LSB, CC_RPN_MSB)
        } else {
            (CC_NRPN_LSB, CC_NRPN_MSB)
        }
    }

    pub fn is_addressed(&self) -> bool {
        self.lsb_addressed && self.msb_addressed
    }

    pub fn resolution(&self) -> NrpnResolution {
        self.resolution
    }

    fn outbound(&self, channel: MidiChannel, value: u16) -> Vec<MidiBytes> {
        let status = channel.status(CONTROL_CHANGE);
        let (lsb_cc, msb_cc) = self.number_ccs();

        let mut messages = vec![[status, lsb_cc, self.lsb], [status, msb_cc, self.msb]];
        match self.resolution {
            NrpnResolution::Coarse => {
                messages.push([status, CC_DATA_ENTRY, (value & 0x7F) as u8]);
            }
            NrpnResolution::Fine => {
                messages.push([status, CC_DATA_ENTRY, ((value >> 7) & 0x7F) as u8]);
                messages.push([status, CC_DATA_ENTRY_LSB, (value & 0x7F) as u8]);
            }
        }
        messages
    }

    fn ingest(&mut self, controller: u8, data: u8, current: u16) -> Option<u16> {
        if !PARAMETER_NUMBER_CCS.contains(&controller) {
            return None;
        }

        let (lsb_cc, msb_cc) = self.number_ccs();
        if controller == lsb_cc {
            self.lsb_addressed = data == self.lsb;
            return None;
        }
        if controller == msb_cc {
            self.msb_addressed = data == self.msb;
            return None;
        }

        if !self.is_addressed() {
            return None;
        }

        match (controller, self.resolution) {
            (CC_DATA_INCREMENT, _) => Some(current.saturating_add(1)),
            (CC_DATA_DECREMENT, _) => Some(current.saturating_sub(1)),
            (CC_DATA_ENTRY, NrpnResolution::Coarse) => Some(data as u16),
            (CC_DATA_ENTRY, NrpnResolution::Fine) => Some(((data as u16) << 7) | (current & 0x7F)),
            (CC_DATA_ENTRY_LSB, NrpnResolution::Fine) => Some((current & !0x7F) | data as u16),
            _ => None,
        }
    }
}

/// Encoding used to carry one parameter over MIDI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessenger {
    /// Single control change message
    ControlChange { controller: u8 },
    /// Parameter number + data entry sequence
    Nrpn(NrpnMessenger),
    /// No discrete message; only travels inside a bulk dump
    Sysex,
}

impl WireMessenger {
    pub fn control_change(controller: u8) -> Self {
        WireMessenger::ControlChange {
            controller: controller & 0x7F,
        }
    }

    /// 7-bit NRPN (or RPN when `registered`) sent as LSB, MSB, data entry
    pub fn nrpn_msb(registered: bool, msb: u8, lsb: u8) -> Self {
        WireMessenger::Nrpn(NrpnMessenger::new(registered, msb, lsb, NrpnResolution::Coarse))
    }

    /// 14-bit NRPN (or RPN) with data entry MSB and LSB
    pub fn nrpn_fine(registered: bool, msb: u8, lsb: u8) -> Self {
        WireMessenger::Nrpn(NrpnMessenger::new(registered, msb, lsb, NrpnResolution::Fine))
    }

    /// Converts a wire value into outbound messages for `channel`
    pub fn outbound(&self, channel: MidiChannel, value: u16) -> Vec<MidiBytes> {
        match self {
            WireMessenger::ControlChange { controller } => vec![[
                channel.status(CONTROL_CHANGE),
                *controller,
                (value & 0x7F) as u8,
            ]],
            WireMessenger::Nrpn(nrpn) => nrpn.outbound(channel, value),
            WireMessenger::Sysex => Vec::new(),
        }
    }

    /// Decodes an inbound message addressed to this parameter
    ///
    /// Returns the raw wire value the message sets, before any range
    /// scaling. `current` is the parameter's present wire value, needed for
    /// increment/decrement and for the halves of a 14-bit value.
    pub fn ingest(&mut self, channel: MidiChannel, bytes: &[u8], current: u16) -> Option<u16> {
        if bytes.len() < 3 || bytes[0] & 0xF0 != CONTROL_CHANGE || !channel.accepts(bytes[0]) {
            return None;
        }

        let (controller, data) = (bytes[1], bytes[2] & 0x7F);
        match self {
            WireMessenger::ControlChange { controller: cc } if *cc == controller => {
                Some(data as u16)
            }
            WireMessenger::ControlChange { .. } => None,
            WireMessenger::Nrpn(nrpn) => nrpn.ingest(controller, data, current),
            WireMessenger::Sysex => None,
        }
    }

    /// True when values only travel inside a bulk dump
    pub fn sysex_needed(&self) -> bool {
        matches!(self, WireMessenger::Sysex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_change_outbound() {
        let cc = WireMessenger::control_change(74);
        assert_eq!(cc.outbound(MidiChannel::new(2), 100), vec![[0xB1, 74, 100]]);
        assert_eq!(cc.outbound(MidiChannel::Omni, 5), vec![[0xB0, 74, 5]]);
    }

    #[test]
    fn test_control_change_ingest_filters_channel() {
        let mut cc = WireMessenger::control_change(74);
        let ch2 = MidiChannel::new(2);

        assert_eq!(cc.ingest(ch2, &[0xB1, 74, 100], 0), Some(100));
        assert_eq!(cc.ingest(ch2, &[0xB0, 74, 100], 0), None);
        assert_eq!(cc.ingest(ch2, &[0xB1, 75, 100], 0), None);
        assert_eq!(cc.ingest(ch2, &[0x91, 74, 100], 0), None);
        assert_eq!(cc.ingest(MidiChannel::Omni, &[0xBF, 74, 9], 0), Some(9));
    }

    #[test]
    fn test_nrpn_coarse_outbound() {
        let nrpn = WireMessenger::nrpn_msb(false, 0, 2);
        assert_eq!(
            nrpn.outbound(MidiChannel::new(1), 127),
            vec![[0xB0, 98, 2], [0xB0, 99, 0], [0xB0, 6, 127]]
        );
    }

    #[test]
    fn test_rpn_uses_registered_numbers() {
        let rpn = WireMessenger::nrpn_msb(true, 0, 0);
        assert_eq!(
            rpn.outbound(MidiChannel::new(1), 2),
            vec![[0xB0, 100, 0], [0xB0, 101, 0], [0xB0, 6, 2]]
        );
    }

    #[test]
    fn test_nrpn_fine_outbound() {
        let nrpn = WireMessenger::nrpn_fine(false, 1, 3);
        assert_eq!(
            nrpn.outbound(MidiChannel::new(16), 300),
            vec![[0xBF, 98, 3], [0xBF, 99, 1], [0xBF, 6, 2], [0xBF, 38, 44]]
        );
    }

    #[test]
    fn test_nrpn_ingest_requires_addressing() {
        let mut nrpn = WireMessenger::nrpn_msb(false, 0, 2);
        let ch = MidiChannel::new(1);

        // data entry before the parameter is selected
        assert_eq!(nrpn.ingest(ch, &[0xB0, 6, 127], 0), None);

        assert_eq!(nrpn.ingest(ch, &[0xB0, 98, 2], 0), None);
        assert_eq!(nrpn.ingest(ch, &[0xB0, 99, 0], 0), None);
        assert_eq!(nrpn.ingest(ch, &[0xB0, 6, 127], 0), Some(127));
        assert_eq!(nrpn.ingest(ch, &[0xB0, 96, 0], 10), Some(11));
        assert_eq!(nrpn.ingest(ch, &[0xB0, 97, 0], 10), Some(9));

        // another parameter selected
        assert_eq!(nrpn.ingest(ch, &[0xB0, 98, 3], 0), None);
        assert_eq!(nrpn.ingest(ch, &[0xB0, 6, 64], 0), None);
    }

    #[test]
    fn test_nrpn_fine_ingest_combines_halves() {
        let mut nrpn = WireMessenger::nrpn_fine(false, 1, 3);
        let ch = MidiChannel::Omni;
        nrpn.ingest(ch, &[0xB4, 98, 3], 0);
        nrpn.ingest(ch, &[0xB4, 99, 1], 0);

        let coarse = nrpn.ingest(ch, &[0xB4, 6, 2], 5).unwrap();
        assert_eq!(coarse, (2 << 7) | 5);
        let fine = nrpn.ingest(ch, &[0xB4, 38, 44], coarse).unwrap();
        assert_eq!(fine, 300);
    }

    #[test]
    fn test_numbers_are_masked_to_seven_bits() {
        let cc = WireMessenger::control_change(0x80 | 74);
        assert_eq!(cc.outbound(MidiChannel::Omni, 1), vec![[0xB0, 74, 1]]);

        let nrpn = WireMessenger::nrpn_msb(false, 0x80, 0x82);
        assert_eq!(
            nrpn.outbound(MidiChannel::Omni, 1),
            vec![[0xB0, 98, 2], [0xB0, 99, 0], [0xB0, 6, 1]]
        );
    }

    #[test]
    fn test_sysex_messenger_is_silent() {
        let mut sysex = WireMessenger::Sysex;
        assert!(sysex.outbound(MidiChannel::new(1), 10).is_empty());
        assert_eq!(sysex.ingest(MidiChannel::Omni, &[0xB0, 6, 1], 0), None);
        assert!(sysex.sysex_needed());
        assert!(!WireMessenger::control_change(1).sysex_needed());
    }
}
