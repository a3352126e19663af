//! AX12 wire framing.
//!
//! Both directions share one shape: `FF FF id len payload.. checksum` with
//! `len` counting the payload plus the checksum byte and the checksum being
//! the bitwise NOT of the sum of everything after the header. Instruction
//! packets carry an instruction byte plus arguments; status packets carry the
//! device error bitfield plus the read-back bytes.

use thiserror::Error;

/// Talking to this id addresses every servo on the chain; nobody answers.
pub const BROADCAST_ID: u8 = 0xFE;

/// Instruction codes understood by the servo firmware.
pub mod instruction {
    pub const PING: u8 = 0x01;
    pub const READ_DATA: u8 = 0x02;
    pub const WRITE_DATA: u8 = 0x03;
    pub const FACTORY_RESET: u8 = 0x06;
}

/// Build an instruction packet ready to go on the wire.
#[must_use]
pub fn instruction_frame(id: u8, instruction: u8, params: &[u8]) -> Vec<u8> {
    let length = params.len() as u8 + 2;
    let mut frame = Vec::with_capacity(params.len() + 6);
    frame.extend_from_slice(&[0xFF, 0xFF, id, length, instruction]);
    frame.extend_from_slice(params);
    frame.push(checksum(id, length, instruction, params));
    frame
}

/// Build a status packet the way a servo would answer. Test rigs and the
/// codec tests use this as the device-side encoder.
#[must_use]
pub fn status_frame(id: u8, error: u8, params: &[u8]) -> Vec<u8> {
    let length = params.len() as u8 + 2;
    let mut frame = Vec::with_capacity(params.len() + 6);
    frame.extend_from_slice(&[0xFF, 0xFF, id, length, error]);
    frame.extend_from_slice(params);
    frame.push(checksum(id, length, error, params));
    frame
}

fn checksum(id: u8, length: u8, kind: u8, params: &[u8]) -> u8 {
    let sum = params
        .iter()
        .fold(id.wrapping_add(length).wrapping_add(kind), |acc, b| {
            acc.wrapping_add(*b)
        });
    !sum
}

/// A decoded status packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFrame {
    pub id: u8,
    /// Device error bitfield; 0 means healthy.
    pub error: u8,
    pub params: Vec<u8>,
}

impl StatusFrame {
    /// Little-endian value of the first one or two parameter bytes.
    #[must_use]
    pub fn value(&self) -> u16 {
        let lo = self.params.first().copied().unwrap_or(0);
        let hi = self.params.get(1).copied().unwrap_or(0);
        u16::from(lo) | (u16::from(hi) << 8)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The length byte must cover at least the error byte and the checksum.
    #[error("status length byte {0} below minimum of 2")]
    BadLength(u8),
    #[error("status checksum mismatch: expected {expected:#04x}, got {got:#04x}")]
    ChecksumMismatch { expected: u8, got: u8 },
}

#[derive(Debug, Clone)]
enum ParseState {
    /// Scanning for the two-byte header; tracks how many 0xFF seen so far.
    Header(u8),
    Id,
    Length { id: u8 },
    Error { id: u8, length: u8 },
    Params { id: u8, length: u8, error: u8 },
    Checksum { id: u8, length: u8, error: u8 },
}

/// Incremental status-packet decoder.
///
/// Bytes are pushed one at a time as they arrive off the half-duplex line;
/// a complete, checksum-verified packet is handed back as soon as its last
/// byte lands. Garbage before the header is skipped; any framing error
/// resets the parser to header scanning so the next packet can still be
/// found.
#[derive(Debug)]
pub struct FrameParser {
    state: ParseState,
    params: Vec<u8>,
}

impl FrameParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ParseState::Header(0),
            params: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.state = ParseState::Header(0);
        self.params.clear();
    }

    /// Consume one byte. `Ok(Some(..))` when it completed a packet,
    /// `Ok(None)` when more bytes are needed.
    pub fn push(&mut self, byte: u8) -> Result<Option<StatusFrame>, FrameError> {
        match self.state {
            ParseState::Header(seen) => {
                if byte == 0xFF {
                    if seen == 1 {
                        self.state = ParseState::Id;
                    } else {
                        self.state = ParseState::Header(1);
                    }
                } else {
                    self.state = ParseState::Header(0);
                }
                Ok(None)
            }
            ParseState::Id => {
                self.state = ParseState::Length { id: byte };
                Ok(None)
            }
            ParseState::Length { id } => {
                if byte < 2 {
                    self.reset();
                    return Err(FrameError::BadLength(byte));
                }
                self.state = ParseState::Error { id, length: byte };
                Ok(None)
            }
            ParseState::Error { id, length } => {
                self.params.clear();
                self.state = if length == 2 {
                    ParseState::Checksum {
                        id,
                        length,
                        error: byte,
                    }
                } else {
                    ParseState::Params {
                        id,
                        length,
                        error: byte,
                    }
                };
                Ok(None)
            }
            ParseState::Params { id, length, error } => {
                self.params.push(byte);
                if self.params.len() as u8 == length - 2 {
                    self.state = ParseState::Checksum { id, length, error };
                }
                Ok(None)
            }
            ParseState::Checksum { id, length, error } => {
                let expected = checksum(id, length, error, &self.params);
                if byte != expected {
                    self.reset();
                    return Err(FrameError::ChecksumMismatch {
                        expected,
                        got: byte,
                    });
                }
                let frame = StatusFrame {
                    id,
                    error,
                    params: std::mem::take(&mut self.params),
                };
                self.state = ParseState::Header(0);
                Ok(Some(frame))
            }
        }
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}
