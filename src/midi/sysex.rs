// SysEx codec - Korg 7-bit packing and frame handling
// Korg bulk dumps carry 8-bit data as groups of one "top bits" byte
// followed by up to seven 7-bit data bytes

use super::event::{MidiChannel, SYSEX_END, SYSEX_START};

/// Korg manufacturer ID
pub const KORG_ID: u8 = 0x42;

/// Format byte prefix for channel-addressed Korg messages (`3n`)
pub const KORG_FORMAT: u8 = 0x30;

/// Length of `F0 42 3n <model> <function>`
pub const KORG_HEADER_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SysexError {
    #[error("SysEx frame too short: {0} bytes")]
    TooShort(usize),

    #[error("Not a matching Korg SysEx header")]
    BadHeader,

    #[error("SysEx addressed to channel nibble {0}")]
    WrongChannel(u8),

    #[error("Unterminated SysEx frame")]
    Unterminated,

    #[error("Unexpected payload length: expected {expected}, got {actual}")]
    BadLength { expected: usize, actual: usize },
}

/// Packs 8-bit data into Korg 7-bit groups
///
/// Each group of up to 7 input bytes becomes a top-bits byte (bit `j` is the
/// high bit of input byte `j`) followed by the input bytes with their high
/// bit cleared. The final group may be shorter than 7.
pub fn pack_korg(bytes: &[u8]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(bytes.len() + bytes.len().div_ceil(7));

    for chunk in bytes.chunks(7) {
        let mut top = 0u8;
        for (j, byte) in chunk.iter().enumerate() {
            top |= ((byte >> 7) & 1) << j;
        }
        packed.push(top);
        packed.extend(chunk.iter().map(|b| b & 0x7F));
    }

    packed
}

/// Unpacks Korg 7-bit groups found in `packed[start..end]`
///
/// `end` is clamped to the slice length.
pub fn unpack_korg(packed: &[u8], start: usize, end: usize) -> Vec<u8> {
    let end = end.min(packed.len());
    if start >= end {
        return Vec::new();
    }

    let region = &packed[start..end];
    let mut unpacked = Vec::with_capacity(region.len() * 7 / 8 + 1);

    for group in region.chunks(8) {
        let top = group[0];
        for (j, byte) in group[1..].iter().enumerate() {
            unpacked.push((byte & 0x7F) | (((top >> j) & 1) << 7));
        }
    }

    unpacked
}

/// Wraps packed payload bytes into `F0 42 3n <model> <function> ... F7`
pub fn frame_korg(channel: MidiChannel, model: u8, function: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + KORG_HEADER_LEN + 1);
    frame.extend_from_slice(&[
        SYSEX_START,
        KORG_ID,
        KORG_FORMAT | channel.status_nibble(),
        model,
        function,
    ]);
    frame.extend_from_slice(payload);
    frame.push(SYSEX_END);
    frame
}

/// Validates a Korg frame and returns the packed payload between header and `F7`
pub fn korg_payload<'a>(
    frame: &'a [u8],
    channel: MidiChannel,
    model: u8,
    function: u8,
) -> Result<&'a [u8], SysexError> {
    if frame.len() < KORG_HEADER_LEN + 1 {
        return Err(SysexError::TooShort(frame.len()));
    }

    if frame[0] != SYSEX_START
        || frame[1] != KORG_ID
        || frame[2] & 0xF0 != KORG_FORMAT
        || frame[3] != model
        || frame[4] != function
    {
        return Err(SysexError::BadHeader);
    }

    let nibble = frame[2] & 0x0F;
    if !channel.accepts(nibble) {
        return Err(SysexError::WrongChannel(nibble));
    }

    if frame[frame.len() - 1] != SYSEX_END {
        return Err(SysexError::Unterminated);
    }

    Ok(&frame[KORG_HEADER_LEN..frame.len() - 1])
}
