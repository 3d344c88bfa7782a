// microKORG kernel - parameter map and program dump layout
// Program data is 254 bytes: a 38 byte program block followed by two
// 108 byte timbre blocks, sent Korg-packed as `F0 42 3n 58 40 ... F7`

use super::kernel::{ControllerKernel, ParameterSet};
use super::parameter::{SelectOption, SynthParameter};
use crate::midi::sysex::{self, SysexError};
use crate::midi::{MidiChannel, WireMessenger};

pub const MICROKORG_MODEL: u8 = 0x58;
pub const PROGRAM_DATA_DUMP: u8 = 0x40;
pub const PROGRAM_LEN: usize = 254;
pub const TIMBRE_1: usize = 38;
pub const TIMBRE_2: usize = 146;

/// How a parameter is stored in the program image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// Whole byte, stored as `value + bias`
    Byte { bias: i32 },
    /// Whole byte, two's complement
    Signed,
    /// `width` bits starting at `shift`, stored as `value + bias`
    Bits { shift: u8, width: u8, bias: i32 },
    /// Big-endian 16 bit value over two bytes
    Word,
}

/// Location of one parameter in the program image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysexField {
    pub offset: usize,
    pub encoding: FieldEncoding,
    /// Select stored as its option index rather than the option's wire value
    pub by_index: bool,
}

impl SysexField {
    pub fn byte(offset: usize) -> Self {
        Self::new(offset, FieldEncoding::Byte { bias: 0 })
    }

    pub fn biased(offset: usize, bias: i32) -> Self {
        Self::new(offset, FieldEncoding::Byte { bias })
    }

    pub fn signed(offset: usize) -> Self {
        Self::new(offset, FieldEncoding::Signed)
    }

    pub fn bits(offset: usize, shift: u8, width: u8) -> Self {
        Self::new(offset, FieldEncoding::Bits { shift, width, bias: 0 })
    }

    pub fn word(offset: usize) -> Self {
        Self::new(offset, FieldEncoding::Word)
    }

    fn new(offset: usize, encoding: FieldEncoding) -> Self {
        Self {
            offset,
            encoding,
            by_index: false,
        }
    }

    fn indexed(mut self) -> Self {
        self.by_index = true;
        self
    }

    fn with_bias(mut self, bias: i32) -> Self {
        if let FieldEncoding::Bits { shift, width, .. } = self.encoding {
            self.encoding = FieldEncoding::Bits { shift, width, bias };
        }
        self
    }

    pub fn read(&self, image: &[u8]) -> i32 {
        let byte = image[self.offset];
        match self.encoding {
            FieldEncoding::Byte { bias } => byte as i32 - bias,
            FieldEncoding::Signed => byte as i8 as i32,
            FieldEncoding::Bits { shift, width, bias } => {
                let mask = (1u16 << width) - 1;
                ((byte as u16 >> shift) & mask) as i32 - bias
            }
            FieldEncoding::Word => ((byte as i32) << 8) | image[self.offset + 1] as i32,
        }
    }

    /// Stores `value`, leaving bits outside the field untouched
    pub fn write(&self, image: &mut [u8], value: i32) {
        match self.encoding {
            FieldEncoding::Byte { bias } => image[self.offset] = (value + bias) as u8,
            FieldEncoding::Signed => image[self.offset] = value as i8 as u8,
            FieldEncoding::Bits { shift, width, bias } => {
                let mask = (((1u16 << width) - 1) << shift) as u8;
                let bits = (((value + bias) as u16) << shift) as u8 & mask;
                image[self.offset] = (image[self.offset] & !mask) | bits;
            }
            FieldEncoding::Word => {
                image[self.offset] = ((value >> 8) & 0xFF) as u8;
                image[self.offset + 1] = (value & 0xFF) as u8;
            }
        }
    }
}

/// Program used before any dump has been received
pub const INIT_PROGRAM: [u8; 297] = [
    0xF0, 0x42, 0x30, 0x58, 0x40, 0x00, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x00, 0x20, 0x20,
    0x20, 0x20, 0x20, 0x00, 0x00, 0x20, 0x07, 0x00, 0x40, 0x00, 0x3C, 0x07, 0x28, 0x00, 0x61, 0x02,
    0x65, 0x7A, 0x02, 0x14, 0x40, 0x00, 0x0F, 0x3B, 0x00, 0x78, 0x00, 0x00, 0x50, 0x0C, 0x01, 0x00,
    0x7F, 0x7F, 0x70, 0x0A, 0x40, 0x00, 0x42, 0x40, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x47, 0x40, 0x00, 0x3E, 0x00, 0x00, 0x00, 0x00, 0x4F, 0x3D, 0x2E, 0x40, 0x01, 0x00, 0x7F, 0x40,
    0x00, 0x40, 0x40, 0x00, 0x1E, 0x00, 0x00, 0x00, 0x00, 0x65, 0x6D, 0x72, 0x02, 0x00, 0x0A, 0x03,
    0x02, 0x30, 0x0C, 0x22, 0x69, 0x00, 0x03, 0x47, 0x42, 0x49, 0x47, 0x32, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x40, 0x40, 0x40, 0x40, 0x00, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x00, 0x00, 0x00, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x40, 0x40, 0x00, 0x00, 0x40, 0x40, 0x40, 0x00, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x7F, 0x00, 0x70, 0x0A,
    0x40, 0x42, 0x40, 0x45, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x40, 0x00, 0x00, 0x7F,
    0x00, 0x00, 0x01, 0x7F, 0x14, 0x00, 0x40, 0x40, 0x40, 0x7F, 0x40, 0x00, 0x40, 0x00, 0x40, 0x00,
    0x40, 0x7F, 0x00, 0x00, 0x40, 0x00, 0x7F, 0x00, 0x02, 0x0A, 0x03, 0x02, 0x46, 0x00, 0x0C, 0x02,
    0x40, 0x03, 0x40, 0x42, 0x40, 0x00, 0x43, 0x40, 0x00, 0x00, 0x00, 0x00, 0x40, 0x00, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x40, 0x00,
    0x00, 0x40, 0x40, 0x40, 0x40, 0x00, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x00, 0x00, 0x00, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x40, 0x40, 0xF7,
];

fn options(labels: &[&str]) -> Vec<SelectOption> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| SelectOption::new(i as u16, label))
        .collect()
}

fn valued(pairs: &[(u16, &str)]) -> Vec<SelectOption> {
    pairs
        .iter()
        .map(|(value, label)| SelectOption::new(*value, label))
        .collect()
}

#[derive(Default)]
struct LayoutBuilder {
    parameters: ParameterSet,
    fields: Vec<SysexField>,
}

impl LayoutBuilder {
    fn add(&mut self, parameter: SynthParameter, field: SysexField) {
        self.parameters.push(parameter);
        self.fields.push(field);
    }

    #[allow(clippy::too_many_arguments)]
    fn int(
        &mut self,
        id: &str,
        label: &str,
        messenger: WireMessenger,
        default: i32,
        min: i32,
        max: i32,
        field: SysexField,
    ) {
        self.add(SynthParameter::int(id, label, messenger, default, min, max), field);
    }

    fn toggle(&mut self, id: &str, label: &str, messenger: WireMessenger, field: SysexField) {
        self.add(SynthParameter::boolean(id, label, messenger, false, 0, 127), field);
    }

    fn select(
        &mut self,
        id: &str,
        label: &str,
        messenger: WireMessenger,
        options: Vec<SelectOption>,
        field: SysexField,
    ) {
        self.add(SynthParameter::select(id, label, messenger, 0, options), field);
    }

    fn program(&mut self) {
        use WireMessenger::Sysex;

        self.int("arp_trigger_length", "Arp Trigger Length", Sysex, 8, 1, 8, SysexField::biased(14, -1));
        self.int("arp_trigger_pattern", "Arp Trigger Pattern", Sysex, 255, 0, 255, SysexField::byte(15));
        self.select(
            "voice_mode",
            "Voice Mode",
            Sysex,
            valued(&[(0, "Single"), (2, "Layer"), (3, "Vocoder")]),
            SysexField::bits(16, 4, 2),
        );
        self.int("scale_key", "Scale Key", Sysex, 0, 0, 11, SysexField::bits(17, 4, 4));
        self.int("scale_type", "Scale Type", Sysex, 0, 0, 9, SysexField::bits(17, 0, 4));

        self.toggle("delay_sync", "Delay Sync", Sysex, SysexField::bits(19, 7, 1));
        self.int("delay_time_base", "Delay Time Base", Sysex, 0, 0, 14, SysexField::bits(19, 0, 4));
        self.int("delay_time", "Delay Time", WireMessenger::nrpn_msb(false, 0, 13), 0, 0, 127, SysexField::byte(20));
        self.int("delay_depth", "Delay Depth", WireMessenger::control_change(94), 0, 0, 127, SysexField::byte(21));
        self.select("delay_type", "Delay Type", Sysex, options(&["Stereo", "Cross", "L/R"]), SysexField::byte(22));

        self.int("mod_speed", "Mod FX Speed", WireMessenger::control_change(12), 0, 0, 127, SysexField::byte(23));
        self.int("mod_depth", "Mod FX Depth", WireMessenger::control_change(93), 0, 0, 127, SysexField::byte(24));
        self.select(
            "mod_type",
            "Mod FX Type",
            Sysex,
            options(&["Cho/Flg", "Ensemble", "Phaser"]),
            SysexField::byte(25),
        );

        self.int("eq_hi_freq", "EQ Hi Freq", Sysex, 0, 0, 29, SysexField::byte(26));
        self.int("eq_hi_gain", "EQ Hi Gain", Sysex, 0, -12, 12, SysexField::biased(27, 64));
        self.int("eq_low_freq", "EQ Low Freq", Sysex, 0, 0, 29, SysexField::byte(28));
        self.int("eq_low_gain", "EQ Low Gain", Sysex, 0, -12, 12, SysexField::biased(29, 64));

        self.int("arp_tempo", "Arp Tempo", Sysex, 120, 20, 300, SysexField::word(30));
        self.select(
            "arp_on",
            "Arp On",
            WireMessenger::nrpn_msb(false, 0, 2),
            valued(&[(0, "Off"), (127, "On")]),
            SysexField::bits(32, 7, 1).indexed(),
        );
        self.select(
            "arp_latch",
            "Arp Latch",
            WireMessenger::nrpn_msb(false, 0, 4),
            valued(&[(0, "Off"), (127, "On")]),
            SysexField::bits(32, 6, 1).indexed(),
        );
        self.select(
            "arp_target",
            "Arp Target",
            Sysex,
            options(&["Both", "Timbre 1", "Timbre 2"]),
            SysexField::bits(32, 4, 2),
        );
        self.toggle("arp_key_sync", "Arp Key Sync", Sysex, SysexField::bits(32, 0, 1));
        self.select(
            "arp_type",
            "Arp Type",
            WireMessenger::nrpn_msb(false, 0, 7),
            valued(&[
                (0, "Up"),
                (26, "Down"),
                (51, "Alt 1"),
                (77, "Alt 2"),
                (102, "Random"),
                (127, "Trigger"),
            ]),
            SysexField::bits(33, 0, 4).indexed(),
        );
        self.int("arp_range", "Arp Range", Sysex, 1, 1, 4, SysexField::bits(33, 4, 4).with_bias(-1));
        self.int("arp_gate", "Arp Gate", WireMessenger::nrpn_msb(false, 0, 10), 50, 0, 100, SysexField::byte(34));
        self.select(
            "arp_resolution",
            "Arp Resolution",
            Sysex,
            options(&["1/24", "1/16", "1/12", "1/8", "1/6", "1/4"]),
            SysexField::byte(35),
        );
        self.int("arp_swing", "Arp Swing", Sysex, 0, -100, 100, SysexField::signed(36));
        self.int("keyboard_octave", "Keyboard Octave", Sysex, 0, -3, 3, SysexField::signed(37));
    }

    /// Timbre block parameters; without `with_cc` every field is dump-only
    fn timbre(&mut self, prefix: &str, base: usize, with_cc: bool) {
        use WireMessenger::Sysex;

        let id = |name: &str| format!("{}_{}", prefix, name);
        let cc = |number: u8| {
            if with_cc {
                WireMessenger::control_change(number)
            } else {
                Sysex
            }
        };

        self.int(&id("midi_channel"), "MIDI Channel", Sysex, -1, -1, 15, SysexField::signed(base));
        self.select(
            &id("assign_mode"),
            "Assign Mode",
            Sysex,
            options(&["Mono", "Poly", "Unison"]),
            SysexField::bits(base + 1, 6, 2),
        );
        self.toggle(&id("eg2_reset"), "EG2 Reset", Sysex, SysexField::bits(base + 1, 5, 1));
        self.toggle(&id("eg1_reset"), "EG1 Reset", Sysex, SysexField::bits(base + 1, 4, 1));
        self.select(
            &id("trigger_mode"),
            "Trigger Mode",
            Sysex,
            options(&["Single", "Multi"]),
            SysexField::bits(base + 1, 3, 1),
        );
        self.int(&id("unison_detune"), "Unison Detune", Sysex, 0, 0, 99, SysexField::byte(base + 2));
        self.int(&id("tune"), "Tune", Sysex, 0, -50, 50, SysexField::biased(base + 3, 64));
        self.int(&id("bend_range"), "Bend Range", Sysex, 2, -12, 12, SysexField::biased(base + 4, 64));
        self.int(&id("transpose"), "Transpose", Sysex, 0, -24, 24, SysexField::biased(base + 5, 64));
        self.int(&id("vibrato_int"), "Vibrato Int", Sysex, 0, -63, 63, SysexField::biased(base + 6, 64));

        self.select(
            &id("osc1_wave"),
            "OSC1 Wave",
            Sysex,
            options(&["Saw", "Pulse", "Triangle", "Sine", "Vox", "DWGS", "Noise", "Audio In"]),
            SysexField::byte(base + 7),
        );
        self.int(&id("osc1_ctrl1"), "OSC1 Control 1", cc(15), 0, 0, 127, SysexField::byte(base + 8));
        self.int(&id("osc1_ctrl2"), "OSC1 Control 2", cc(17), 0, 0, 127, SysexField::byte(base + 9));
        self.int(&id("osc1_dwgs"), "OSC1 DWGS Wave", Sysex, 0, 0, 63, SysexField::byte(base + 10));
        self.select(
            &id("osc2_mod"),
            "OSC2 Mod",
            Sysex,
            options(&["Off", "Ring", "Sync", "Ring+Sync"]),
            SysexField::bits(base + 12, 4, 2),
        );
        self.select(
            &id("osc2_wave"),
            "OSC2 Wave",
            Sysex,
            options(&["Saw", "Square", "Triangle"]),
            SysexField::bits(base + 12, 0, 2),
        );
        self.int(&id("osc2_semitone"), "OSC2 Semitone", cc(18), 0, -24, 24, SysexField::biased(base + 13, 64));
        self.int(&id("osc2_tune"), "OSC2 Tune", cc(19), 0, -63, 63, SysexField::biased(base + 14, 64));
        self.int(&id("portamento"), "Portamento", cc(5), 0, 0, 127, SysexField::bits(base + 15, 0, 7));

        self.int(&id("osc1_level"), "OSC1 Level", cc(20), 127, 0, 127, SysexField::byte(base + 16));
        self.int(&id("osc2_level"), "OSC2 Level", cc(21), 0, 0, 127, SysexField::byte(base + 17));
        self.int(&id("noise_level"), "Noise Level", cc(22), 0, 0, 127, SysexField::byte(base + 18));

        self.select(
            &id("filter_type"),
            "Filter Type",
            Sysex,
            options(&["24LPF", "12LPF", "12BPF", "12HPF"]),
            SysexField::byte(base + 19),
        );
        self.int(&id("cutoff"), "Cutoff", cc(74), 127, 0, 127, SysexField::byte(base + 20));
        self.int(&id("resonance"), "Resonance", cc(71), 0, 0, 127, SysexField::byte(base + 21));
        self.int(&id("filter_eg_int"), "Filter EG Int", cc(79), 0, -63, 63, SysexField::biased(base + 22, 64));
        self.int(&id("filter_velocity"), "Filter Velocity Sense", Sysex, 0, -63, 63, SysexField::biased(base + 23, 64));
        self.int(&id("filter_key_track"), "Filter Key Track", Sysex, 0, -63, 63, SysexField::biased(base + 24, 64));

        self.int(&id("amp_level"), "Amp Level", cc(7), 127, 0, 127, SysexField::byte(base + 25));
        self.int(&id("pan"), "Pan", cc(10), 0, -63, 63, SysexField::biased(base + 26, 64));
        self.toggle(&id("amp_switch"), "Amp Switch", Sysex, SysexField::bits(base + 27, 6, 1));
        self.toggle(&id("distortion"), "Distortion", Sysex, SysexField::bits(base + 27, 0, 1));
        self.int(&id("amp_velocity"), "Amp Velocity Sense", Sysex, 0, -63, 63, SysexField::biased(base + 28, 64));
        self.int(&id("amp_key_track"), "Amp Key Track", Sysex, 0, -63, 63, SysexField::biased(base + 29, 64));

        let eg_ccs = [[23, 24, 25, 26], [73, 75, 70, 72]];
        for (eg, ccs) in eg_ccs.iter().enumerate() {
            for (stage, name) in ["attack", "decay", "sustain", "release"].iter().enumerate() {
                self.int(
                    &id(&format!("eg{}_{}", eg + 1, name)),
                    &format!("EG{} {}", eg + 1, name),
                    cc(ccs[stage]),
                    0,
                    0,
                    127,
                    SysexField::byte(base + 30 + eg * 4 + stage),
                );
            }
        }

        for (lfo, freq_cc) in [(1usize, 27u8), (2, 76)] {
            let at = base + 38 + (lfo - 1) * 3;
            self.select(
                &id(&format!("lfo{}_wave", lfo)),
                "LFO Wave",
                Sysex,
                options(&["Saw", "Square", "Triangle", "S&H"]),
                SysexField::bits(at, 0, 2),
            );
            self.select(
                &id(&format!("lfo{}_key_sync", lfo)),
                "LFO Key Sync",
                Sysex,
                options(&["Off", "Timbre", "Voice"]),
                SysexField::bits(at, 4, 2),
            );
            self.int(
                &id(&format!("lfo{}_freq", lfo)),
                "LFO Frequency",
                cc(freq_cc),
                0,
                0,
                127,
                SysexField::byte(at + 1),
            );
            self.toggle(
                &id(&format!("lfo{}_tempo_sync", lfo)),
                "LFO Tempo Sync",
                Sysex,
                SysexField::bits(at + 2, 7, 1),
            );
            self.int(
                &id(&format!("lfo{}_sync_note", lfo)),
                "LFO Sync Note",
                Sysex,
                0,
                0,
                14,
                SysexField::bits(at + 2, 0, 5),
            );
        }

        for patch in 0..4usize {
            let at = base + 44 + patch * 2;
            self.select(
                &id(&format!("patch{}_dest", patch + 1)),
                "Patch Destination",
                Sysex,
                options(&["Pitch", "OSC2 Tune", "OSC1 Ctrl", "Cutoff", "Amp", "Pan", "LFO2 Freq"]),
                SysexField::bits(at, 4, 4),
            );
            self.select(
                &id(&format!("patch{}_src", patch + 1)),
                "Patch Source",
                Sysex,
                options(&["EG1", "EG2", "LFO1", "LFO2", "Velocity", "Key Track", "MIDI 1", "MIDI 2"]),
                SysexField::bits(at, 0, 4),
            );
            self.int(
                &id(&format!("patch{}_int", patch + 1)),
                "Patch Intensity",
                cc(28 + patch as u8),
                0,
                -63,
                63,
                SysexField::biased(at + 1, 64),
            );
        }
    }
}

/// Kernel for the Korg microKORG
///
/// Timbre 1 parameters have CC or NRPN messages; program-level settings and
/// timbre 2 only travel inside a program dump. The last received program
/// image is kept so bytes this kernel does not model (name, vocoder and
/// sequencer blocks) go back out unchanged.
pub struct MicrokorgKernel {
    parameters: ParameterSet,
    fields: Vec<SysexField>,
    image: Vec<u8>,
    /// Parameter values as they were when `image` was taken; `None` marks a
    /// field whose bytes are overwritten on the next dump
    image_values: Vec<Option<i32>>,
    channel: MidiChannel,
}

impl MicrokorgKernel {
    pub fn new(channel: MidiChannel) -> Self {
        let mut layout = LayoutBuilder::default();
        layout.program();
        layout.timbre("t1", TIMBRE_1, true);
        layout.timbre("t2", TIMBRE_2, false);

        let image = sysex::unpack_korg(&INIT_PROGRAM, sysex::KORG_HEADER_LEN, INIT_PROGRAM.len() - 1);
        let mut kernel = Self {
            image_values: Vec::new(),
            parameters: layout.parameters,
            fields: layout.fields,
            image,
            channel,
        };
        kernel.image_values = kernel
            .decode_image(&kernel.image)
            .into_iter()
            .zip(kernel.parameters.iter())
            .map(|(decoded, parameter)| Some(decoded.unwrap_or(parameter.value())))
            .collect();
        kernel
    }

    /// Field layout, in parameter order
    pub fn fields(&self) -> &[SysexField] {
        &self.fields
    }

    /// Decoded program image (254 bytes)
    pub fn program_image(&self) -> &[u8] {
        &self.image
    }

    /// Parameter values described by `image`, `None` where a field holds no valid value
    fn decode_image(&self, image: &[u8]) -> Vec<Option<i32>> {
        self.parameters
            .iter()
            .zip(&self.fields)
            .map(|(parameter, field)| {
                let raw = field.read(image);
                if field.by_index {
                    (0..=parameter.max()).contains(&raw).then_some(raw)
                } else {
                    parameter.decode_sysex_value(raw)
                }
            })
            .collect()
    }

    fn load(&mut self, data: &[u8]) -> Result<usize, SysexError> {
        let payload = sysex::korg_payload(data, self.channel, MICROKORG_MODEL, PROGRAM_DATA_DUMP)?;
        let image = sysex::unpack_korg(payload, 0, payload.len());
        if image.len() != PROGRAM_LEN {
            return Err(SysexError::BadLength {
                expected: PROGRAM_LEN,
                actual: image.len(),
            });
        }

        let decoded = self.decode_image(&image);
        let mut values = Vec::with_capacity(decoded.len());
        let mut changed = 0;
        for (parameter, value) in self.parameters.iter_mut().zip(decoded) {
            match value {
                Some(value) => {
                    if parameter.update_from_sysex(value) {
                        changed += 1;
                    }
                    values.push(Some(parameter.value()));
                }
                // keep the device's bytes unless a local edit is still pending
                None if parameter.is_midi_dirty() => values.push(None),
                None => values.push(Some(parameter.value())),
            }
        }

        self.image = image;
        self.image_values = values;
        Ok(changed)
    }
}

impl Default for MicrokorgKernel {
    fn default() -> Self {
        Self::new(MidiChannel::new(1))
    }
}

impl ControllerKernel for MicrokorgKernel {
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

    /// Writes changed parameters over the last image and frames it
    fn to_sysex(&self) -> Option<Vec<u8>> {
        let mut image = self.image.clone();
        for ((parameter, field), loaded) in self
            .parameters
            .iter()
            .zip(&self.fields)
            .zip(&self.image_values)
        {
            if *loaded == Some(parameter.value()) {
                continue;
            }
            let stored = if field.by_index {
                parameter.value()
            } else {
                parameter.sysex_value()
            };
            field.write(&mut image, stored);
        }

        Some(sysex::frame_korg(
            self.channel,
            MICROKORG_MODEL,
            PROGRAM_DATA_DUMP,
            &sysex::pack_korg(&image),
        ))
    }

    fn from_sysex(&mut self, data: &[u8]) -> bool {
        match self.load(data) {
            Ok(changed) => {
                log::debug!("microKORG program loaded, {} parameters changed", changed);
                true
            }
            Err(err) => {
                log::debug!("ignoring SysEx frame: {}", err);
                false
            }
        }
    }
}
