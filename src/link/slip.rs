//! SLIP (RFC 1055) framing.
//!
//! A frame is `END`, the escaped packet bytes, `END`. Inside a frame `END`
//! is sent as `ESC ESC_END` and `ESC` as `ESC ESC_ESC`.

pub const END: u8 = 0xC0;
pub const ESC: u8 = 0xDB;
pub const ESC_END: u8 = 0xDC;
pub const ESC_ESC: u8 = 0xDD;

/// Largest packet a sender will frame.
pub const MAX_SEND: usize = 1006;

/// Largest frame a receiver will accept; peers may send a little more than
/// we do.
pub const MAX_RECEIVE: usize = 1024;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("refusing to frame an empty packet")]
    Empty,
    #[error("packet of {0} bytes exceeds the {MAX_SEND}-byte frame limit")]
    Oversize(usize),
}

/// Escape `END` and `ESC` bytes in `data`.
pub fn escape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        match byte {
            END => out.extend_from_slice(&[ESC, ESC_END]),
            ESC => out.extend_from_slice(&[ESC, ESC_ESC]),
            _ => out.push(byte),
        }
    }
    out
}

/// Frame a packet for the wire.
pub fn frame(packet: &[u8]) -> Result<Vec<u8>, FrameError> {
    if packet.is_empty() {
        return Err(FrameError::Empty);
    }
    if packet.len() > MAX_SEND {
        return Err(FrameError::Oversize(packet.len()));
    }

    let escaped = escape(packet);
    let mut framed = Vec::with_capacity(escaped.len() + 2);
    framed.push(END);
    framed.extend_from_slice(&escaped);
    framed.push(END);
    Ok(framed)
}

/// Reassembles packets from a byte stream, one byte at a time.
///
/// An overlong frame is discarded in full: everything up to and including
/// the next `END` is thrown away, after which decoding resumes normally.
#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
    escaped: bool,
    in_error: bool,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one received byte. Returns a packet when `byte` completes a
    /// non-empty frame.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        if self.in_error {
            if byte == END {
                self.reset();
            }
            return None;
        }

        if self.escaped {
            self.escaped = false;
            match byte {
                ESC_END => self.store(END),
                ESC_ESC => self.store(ESC),
                other => {
                    log::warn!("Accepting illegal byte {:#04x} after ESC", other);
                    self.store(other);
                }
            }
            return None;
        }

        match byte {
            END if self.buf.is_empty() => None,
            END => Some(std::mem::take(&mut self.buf)),
            ESC => {
                self.escaped = true;
                None
            }
            _ => {
                self.store(byte);
                None
            }
        }
    }

    fn store(&mut self, byte: u8) {
        if self.buf.len() < MAX_RECEIVE {
            self.buf.push(byte);
        } else {
            log::error!("SLIP framing error, frame exceeds {MAX_RECEIVE} bytes; maybe lost END");
            self.in_error = true;
        }
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.escaped = false;
        self.in_error = false;
    }
}
