//! # NetBIOS Session Codec
//!
//! Frames SMB messages over a byte stream using the RFC 1002 session service
//! header:
//! ```text
//! [Type(1)] [Flags(1)] [Length(2, big-endian)] [Payload(Length)]
//! ```
//! The low bit of the flags byte extends the length to 17 bits.
//!
//! Session keep-alive frames are consumed silently. Any other non-message frame
//! type is a protocol violation once a session is established.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::core::packet::HEADER_LEN;
use crate::error::{constants, ProtocolError, Result};

/// Session message frame type
pub const SESSION_MESSAGE: u8 = 0x00;
/// Session keep-alive frame type
pub const SESSION_KEEP_ALIVE: u8 = 0x85;

/// Largest payload the 17-bit length field can describe
pub const MAX_FRAME_SIZE: usize = 0x1_FFFF;

/// A complete keep-alive frame
pub const KEEP_ALIVE_FRAME: [u8; HEADER_LEN] = [SESSION_KEEP_ALIVE, 0, 0, 0];

/// Write a session message header for a payload of `len` bytes
pub fn write_session_header(header: &mut [u8], len: usize) -> Result<()> {
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::OversizedPacket(len));
    }
    if header.len() < HEADER_LEN {
        return Err(ProtocolError::BufferOverflow {
            offset: 0,
            len: HEADER_LEN,
            capacity: header.len(),
        });
    }

    header[0] = SESSION_MESSAGE;
    header[1] = ((len >> 16) & 0x01) as u8;
    header[2..4].copy_from_slice(&((len & 0xFFFF) as u16).to_be_bytes());
    Ok(())
}

/// Payload length described by a session header
pub fn session_length(header: &[u8; HEADER_LEN]) -> usize {
    (usize::from(header[1] & 0x01) << 16) | usize::from(u16::from_be_bytes([header[2], header[3]]))
}

#[derive(Debug, Clone, Copy)]
pub struct NetbiosCodec {
    max_frame_size: usize,
}

impl Default for NetbiosCodec {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl NetbiosCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size: max_frame_size.min(MAX_FRAME_SIZE),
        }
    }
}

impl Decoder for NetbiosCodec {
    type Item = BytesMut;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            if src.len() < HEADER_LEN {
                return Ok(None);
            }

            let header = [src[0], src[1], src[2], src[3]];
            let len = session_length(&header);

            match header[0] {
                SESSION_MESSAGE => {}
                SESSION_KEEP_ALIVE => {
                    if src.len() < HEADER_LEN + len {
                        return Ok(None);
                    }
                    trace!("Skipping NetBIOS keep-alive");
                    src.advance(HEADER_LEN + len);
                    continue;
                }
                _ => {
                    return Err(ProtocolError::TransportError(
                        constants::ERR_INVALID_FRAME_TYPE.to_string(),
                    ))
                }
            }

            if len > self.max_frame_size {
                return Err(ProtocolError::OversizedPacket(len));
            }

            if src.len() < HEADER_LEN + len {
                src.reserve(HEADER_LEN + len - src.len());
                return Ok(None);
            }

            src.advance(HEADER_LEN);
            return Ok(Some(src.split_to(len)));
        }
    }
}

impl Encoder<Bytes> for NetbiosCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        if item.len() > self.max_frame_size {
            return Err(ProtocolError::OversizedPacket(item.len()));
        }

        let mut header = [0u8; HEADER_LEN];
        write_session_header(&mut header, item.len())?;

        dst.reserve(HEADER_LEN + item.len());
        dst.put_slice(&header);
        dst.put_slice(&item);
        Ok(())
    }
}
