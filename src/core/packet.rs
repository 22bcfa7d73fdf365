//! # SMB Packet Layout
//!
//! [`SmbPacket`] owns a mutable buffer holding a single SMB1 message, preceded by
//! room for the 4-byte NetBIOS session header the transport fills in.
//!
//! ## Wire Format
//! Offsets relative to the end of the NetBIOS header, little-endian:
//! ```text
//! [0xFF 'S' 'M' 'B'(4)] [Command(1)] [Status(4)] [Flags(1)] [Flags2(2)]
//! [PID-High(2)] [Signature(8)] [Reserved(2)] [TID(2)] [PID(2)] [UID(2)] [MID(2)]
//! [WordCount(1)] [Parameter words(2 x WordCount)] [ByteCount(2)] [Bytes(ByteCount)]
//! ```
//! The legacy session id (18) and sequence number (20) fields overlap the
//! signature field.
//!
//! ## Offsets
//! Everything past the parameter words moves with the word count, so the byte
//! area offset, the byte count and the total length are always recomputed from
//! the current header contents. None of them is cached.
//!
//! ## Cursors
//! A single position (`pos`) is used both for packing requests and unpacking
//! responses. `endpos` is only set when entering unpack mode
//! ([`SmbPacket::reset_byte_pointer`], [`SmbPacket::set_byte_pointer`]) and
//! bounds [`SmbPacket::has_more_data`].

use std::fmt;
use std::time::Instant;

use crate::core::command::NO_CHAINED_COMMAND;
use crate::core::packer;
use crate::core::status::{SmbStatus, LEGACY_SUCCESS, NT_SUCCESS};
use crate::error::{ProtocolError, Result};

/// NetBIOS session header length reserved at the start of every buffer
pub const HEADER_LEN: usize = 4;

pub const SMB_HEADER: usize = HEADER_LEN;
pub const COMMAND: usize = 4 + HEADER_LEN;
pub const ERROR_CLASS: usize = 5 + HEADER_LEN;
pub const LONG_ERROR_CODE: usize = 5 + HEADER_LEN;
pub const ERROR_CODE: usize = 7 + HEADER_LEN;
pub const FLAGS: usize = 9 + HEADER_LEN;
pub const FLAGS2: usize = 10 + HEADER_LEN;
pub const PID_HIGH: usize = 12 + HEADER_LEN;
pub const SIGNATURE: usize = 14 + HEADER_LEN;
pub const SID: usize = 18 + HEADER_LEN;
pub const SEQ_NO: usize = 20 + HEADER_LEN;
pub const TID: usize = 24 + HEADER_LEN;
pub const PID: usize = 26 + HEADER_LEN;
pub const UID: usize = 28 + HEADER_LEN;
pub const MID: usize = 30 + HEADER_LEN;
pub const WORD_COUNT: usize = 32 + HEADER_LEN;
pub const ANDX_COMMAND: usize = 33 + HEADER_LEN;
pub const ANDX_RESERVED: usize = 34 + HEADER_LEN;
pub const PARAM_WORDS: usize = 33 + HEADER_LEN;

/// Header length of a transaction request, parameter words included
pub const TRANS_HEADER_LEN: usize = 66 + HEADER_LEN;

/// Minimum receive length, after the NetBIOS header, for a valid SMB packet
pub const MIN_RX_LEN: usize = 32;

/// Default packet buffer size
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Smallest buffer that can hold a header with 255 parameter words and the byte count
pub const MIN_BUFFER_SIZE: usize = PARAM_WORDS + 2 * u8::MAX as usize + 2;

/// SMB1 protocol marker
pub const SMB_SIGNATURE: [u8; 4] = [0xFF, b'S', b'M', b'B'];

/// Maximum string length unpacked without an explicit length
const MAX_STRING_LEN: usize = 255;

/// Header flags bits
pub mod flags {
    pub const SUB_DIALECT: u8 = 0x01;
    pub const CASELESS: u8 = 0x08;
    pub const CANONICAL: u8 = 0x10;
    pub const OPLOCK: u8 = 0x20;
    pub const NOTIFY: u8 = 0x40;
    pub const RESPONSE: u8 = 0x80;
}

/// Header flags2 bits
pub mod flags2 {
    pub const LONG_FILENAMES: u16 = 0x0001;
    pub const EXTENDED_ATTRIBUTES: u16 = 0x0002;
    pub const SECURITY_SIGNATURE: u16 = 0x0004;
    pub const EXTENDED_SECURITY: u16 = 0x0800;
    pub const READ_IF_EXECUTE: u16 = 0x2000;
    pub const LONG_ERROR_CODE: u16 = 0x4000;
    pub const UNICODE: u16 = 0x8000;
}

/// A single SMB1 request or response held in an owned buffer.
#[derive(Clone)]
pub struct SmbPacket {
    buf: Vec<u8>,
    /// Command this packet was built for, used to correlate the response
    command: u8,
    pos: usize,
    endpos: usize,
    last_tx: Option<Instant>,
}

impl Default for SmbPacket {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SmbPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmbPacket")
            .field("command", &self.command())
            .field("flags", &self.flags())
            .field("flags2", &self.flags2())
            .field("mid", &self.multiplex_id())
            .field("parameter_count", &self.parameter_count())
            .field("byte_count", &self.byte_count())
            .field("capacity", &self.buf.len())
            .field("pos", &self.pos)
            .finish()
    }
}

impl SmbPacket {
    /// Allocate a packet with the default buffer size
    pub fn new() -> Self {
        let mut packet = Self {
            buf: vec![0u8; DEFAULT_BUFFER_SIZE],
            command: 0,
            pos: PARAM_WORDS,
            endpos: PARAM_WORDS,
            last_tx: None,
        };
        packet.initialize_buffer();
        packet
    }

    /// Allocate a packet with a specific buffer size
    ///
    /// # Errors
    /// Fails when `size` is smaller than [`MIN_BUFFER_SIZE`].
    pub fn with_capacity(size: usize) -> Result<Self> {
        if size < MIN_BUFFER_SIZE {
            return Err(ProtocolError::BufferOverflow {
                offset: 0,
                len: MIN_BUFFER_SIZE,
                capacity: size,
            });
        }

        let mut packet = Self {
            buf: vec![0u8; size],
            command: 0,
            pos: PARAM_WORDS,
            endpos: PARAM_WORDS,
            last_tx: None,
        };
        packet.initialize_buffer();
        Ok(packet)
    }

    /// Build a packet from SMB message bytes (everything after the NetBIOS header)
    ///
    /// The saved command is taken from the message so the packet correlates with
    /// itself.
    pub fn from_bytes(message: &[u8]) -> Result<Self> {
        if message.len() < MIN_RX_LEN {
            return Err(ProtocolError::ShortReceive(message.len()));
        }
        if message[..4] != SMB_SIGNATURE {
            return Err(ProtocolError::InvalidHeader);
        }

        let size = (HEADER_LEN + message.len()).max(DEFAULT_BUFFER_SIZE);
        let mut packet = Self::with_capacity(size)?;
        packet.buf[HEADER_LEN..HEADER_LEN + message.len()].copy_from_slice(message);
        packet.command = packet.command();
        Ok(packet)
    }

    fn initialize_buffer(&mut self) {
        self.buf[SMB_HEADER..SMB_HEADER + 4].copy_from_slice(&SMB_SIGNATURE);
    }

    /// Clear the header, parameter/byte counts and cursors so the buffer can be reused
    pub fn reset(&mut self) {
        self.buf[COMMAND..PARAM_WORDS + 2].fill(0);
        self.initialize_buffer();
        self.command = 0;
        self.pos = PARAM_WORDS;
        self.endpos = PARAM_WORDS;
        self.last_tx = None;
    }

    // ------------------------------------------------------------------
    // Raw header access. Fixed offsets are always inside MIN_BUFFER_SIZE.
    // ------------------------------------------------------------------

    #[inline]
    fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.buf[offset], self.buf[offset + 1]])
    }

    #[inline]
    fn write_u16(&mut self, offset: usize, val: u16) {
        self.buf[offset..offset + 2].copy_from_slice(&val.to_le_bytes());
    }

    /// Whole buffer, NetBIOS header area included
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable access to the whole buffer, used by transports receiving in place
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Total buffer size
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Buffer space available to the SMB message
    pub fn buffer_length(&self) -> usize {
        self.buf.len() - HEADER_LEN
    }

    /// Space left for the byte area, measured from the aligned byte offset
    pub fn available_length(&self) -> usize {
        self.buf
            .len()
            .saturating_sub(packer::longword_align(self.byte_offset()))
    }

    /// True when the SMB marker is present at the start of the message
    pub fn has_smb_signature(&self) -> bool {
        self.buf[SMB_HEADER..SMB_HEADER + 4] == SMB_SIGNATURE
    }

    pub fn command(&self) -> u8 {
        self.buf[COMMAND]
    }

    /// Set the command, which also becomes the response correlation key
    pub fn set_command(&mut self, cmd: u8) {
        self.command = cmd;
        self.buf[COMMAND] = cmd;
    }

    /// The command this packet was built for
    pub fn expected_command(&self) -> u8 {
        self.command
    }

    /// Set the correlation key without touching the header, for receive buffers
    pub fn expect_command(&mut self, cmd: u8) {
        self.command = cmd;
    }

    pub fn error_class(&self) -> u8 {
        self.buf[ERROR_CLASS]
    }

    pub fn set_error_class(&mut self, class: u8) {
        self.buf[ERROR_CLASS] = class;
    }

    pub fn error_code(&self) -> u8 {
        self.buf[ERROR_CODE]
    }

    pub fn set_error_code(&mut self, code: u8) {
        self.buf[ERROR_CODE] = code;
    }

    pub fn long_error_code(&self) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.buf[LONG_ERROR_CODE..LONG_ERROR_CODE + 4]);
        u32::from_le_bytes(raw)
    }

    pub fn set_long_error_code(&mut self, status: u32) {
        self.buf[LONG_ERROR_CODE..LONG_ERROR_CODE + 4].copy_from_slice(&status.to_le_bytes());
    }

    pub fn flags(&self) -> u8 {
        self.buf[FLAGS]
    }

    pub fn set_flags(&mut self, flg: u8) {
        self.buf[FLAGS] = flg;
    }

    pub fn flags2(&self) -> u16 {
        self.read_u16(FLAGS2)
    }

    pub fn set_flags2(&mut self, flg: u16) {
        self.write_u16(FLAGS2, flg);
    }

    pub fn process_id_high(&self) -> u16 {
        self.read_u16(PID_HIGH)
    }

    pub fn set_process_id_high(&mut self, pid: u16) {
        self.write_u16(PID_HIGH, pid);
    }

    /// Security signature field as a little-endian value
    pub fn signature(&self) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.buf[SIGNATURE..SIGNATURE + 8]);
        u64::from_le_bytes(raw)
    }

    pub fn signature_bytes(&self) -> [u8; 8] {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.buf[SIGNATURE..SIGNATURE + 8]);
        raw
    }

    pub fn set_signature(&mut self, sig: u64) {
        self.buf[SIGNATURE..SIGNATURE + 8].copy_from_slice(&sig.to_le_bytes());
    }

    pub fn set_signature_bytes(&mut self, sig: &[u8; 8]) {
        self.buf[SIGNATURE..SIGNATURE + 8].copy_from_slice(sig);
    }

    /// Store a 32-bit sequence number in the signature field, upper half zeroed
    pub fn set_signature_sequence(&mut self, seq: u32) {
        self.set_signature(u64::from(seq));
    }

    pub fn session_id(&self) -> u16 {
        self.read_u16(SID)
    }

    pub fn set_session_id(&mut self, sid: u16) {
        self.write_u16(SID, sid);
    }

    pub fn sequence_number(&self) -> u16 {
        self.read_u16(SEQ_NO)
    }

    /// Sequence number for connectionless commands
    pub fn set_sequence_number(&mut self, seq: u16) {
        self.write_u16(SEQ_NO, seq);
    }

    pub fn tree_id(&self) -> u16 {
        self.read_u16(TID)
    }

    pub fn set_tree_id(&mut self, tid: u16) {
        self.write_u16(TID, tid);
    }

    pub fn process_id(&self) -> u16 {
        self.read_u16(PID)
    }

    pub fn set_process_id(&mut self, pid: u16) {
        self.write_u16(PID, pid);
    }

    pub fn user_id(&self) -> u16 {
        self.read_u16(UID)
    }

    pub fn set_user_id(&mut self, uid: u16) {
        self.write_u16(UID, uid);
    }

    pub fn multiplex_id(&self) -> u16 {
        self.read_u16(MID)
    }

    pub fn set_multiplex_id(&mut self, mid: u16) {
        self.write_u16(MID, mid);
    }

    /// Secondary (chained) command code
    pub fn andx_command(&self) -> u8 {
        self.buf[ANDX_COMMAND]
    }

    /// Set the chained command. Disabling the chain clears the AndX offset word.
    pub fn set_andx_command(&mut self, cmd: u8) {
        self.buf[ANDX_COMMAND] = cmd;
        self.buf[ANDX_RESERVED] = 0;

        if cmd == NO_CHAINED_COMMAND {
            self.write_u16(PARAM_WORDS + 2, 0);
        }
    }

    // ------------------------------------------------------------------
    // Flag views
    // ------------------------------------------------------------------

    pub fn is_response(&self) -> bool {
        self.flags() & flags::RESPONSE != 0
    }

    pub fn is_request(&self) -> bool {
        !self.is_response()
    }

    pub fn is_caseless(&self) -> bool {
        self.flags() & flags::CASELESS != 0
    }

    pub fn is_canonical(&self) -> bool {
        self.flags() & flags::CANONICAL != 0
    }

    pub fn is_oplock(&self) -> bool {
        self.flags() & flags::OPLOCK != 0
    }

    pub fn is_notify(&self) -> bool {
        self.flags() & flags::NOTIFY != 0
    }

    pub fn has_long_filenames(&self) -> bool {
        self.flags2() & flags2::LONG_FILENAMES != 0
    }

    pub fn has_extended_attributes(&self) -> bool {
        self.flags2() & flags2::EXTENDED_ATTRIBUTES != 0
    }

    pub fn has_security_signature(&self) -> bool {
        self.flags2() & flags2::SECURITY_SIGNATURE != 0
    }

    pub fn has_extended_security(&self) -> bool {
        self.flags2() & flags2::EXTENDED_SECURITY != 0
    }

    pub fn is_long_error_code(&self) -> bool {
        self.flags2() & flags2::LONG_ERROR_CODE != 0
    }

    pub fn is_unicode(&self) -> bool {
        self.flags2() & flags2::UNICODE != 0
    }

    // ------------------------------------------------------------------
    // Parameter words and byte area
    // ------------------------------------------------------------------

    pub fn parameter_count(&self) -> u8 {
        self.buf[WORD_COUNT]
    }

    pub fn set_parameter_count(&mut self, cnt: u8) {
        self.buf[WORD_COUNT] = cnt;
    }

    /// Read a parameter word.
    ///
    /// Index `parameter_count()` itself is accepted, one slot past the declared
    /// words, matching what deployed peers expect. Anything beyond it fails.
    pub fn parameter(&self, idx: usize) -> Result<u16> {
        let count = self.parameter_count();
        if idx > usize::from(count) {
            return Err(ProtocolError::ParameterIndex { index: idx, count });
        }
        Ok(self.read_u16(PARAM_WORDS + 2 * idx))
    }

    /// Read two consecutive parameter words as a 32-bit value
    pub fn parameter_long(&self, idx: usize) -> Result<u32> {
        packer::get_u32_le(&self.buf, PARAM_WORDS + 2 * idx)
    }

    pub fn set_parameter(&mut self, idx: usize, val: u16) -> Result<()> {
        packer::put_u16_le(val, &mut self.buf, PARAM_WORDS + 2 * idx)?;
        Ok(())
    }

    pub fn set_parameter_long(&mut self, idx: usize, val: u32) -> Result<()> {
        packer::put_u32_le(val, &mut self.buf, PARAM_WORDS + 2 * idx)?;
        Ok(())
    }

    /// Offset of the byte area, recomputed from the current word count
    pub fn byte_offset(&self) -> usize {
        WORD_COUNT + 2 * usize::from(self.parameter_count()) + 3
    }

    /// Byte count stored just before the byte area
    pub fn byte_count(&self) -> u16 {
        self.read_u16(self.byte_offset() - 2)
    }

    pub fn set_byte_count(&mut self, cnt: u16) {
        let offset = self.byte_offset() - 2;
        self.write_u16(offset, cnt);
    }

    /// Set the byte count from the current pack position
    pub fn set_byte_count_from_position(&mut self) -> Result<()> {
        let len = self.pos.saturating_sub(self.byte_offset());
        let cnt = u16::try_from(len).map_err(|_| ProtocolError::OversizedPacket(len))?;
        self.set_byte_count(cnt);
        Ok(())
    }

    /// Zero the byte count
    pub fn clear_bytes(&mut self) {
        self.set_byte_count(0);
    }

    /// Copy `bytes` into the byte area and set the byte count
    pub fn set_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let cnt = u16::try_from(bytes.len())
            .map_err(|_| ProtocolError::OversizedPacket(bytes.len()))?;
        let offset = self.byte_offset();
        packer::put_bytes(bytes, &mut self.buf, offset)?;
        self.set_byte_count(cnt);
        Ok(())
    }

    /// Borrow the byte area as declared by the byte count
    pub fn bytes(&self) -> Result<&[u8]> {
        packer::get_bytes(&self.buf, self.byte_offset(), usize::from(self.byte_count()))
    }

    /// Number of populated bytes after the NetBIOS header
    pub fn total_length(&self) -> usize {
        self.byte_offset() + usize::from(self.byte_count()) - HEADER_LEN
    }

    /// The SMB message bytes, from the marker to the end of the byte area
    pub fn message(&self) -> Result<&[u8]> {
        packer::get_bytes(&self.buf, HEADER_LEN, self.total_length())
    }

    /// Mutable view over the header area and SMB message, for transports
    pub fn frame_mut(&mut self) -> Result<&mut [u8]> {
        let end = HEADER_LEN + self.total_length();
        let capacity = self.buf.len();
        self.buf.get_mut(..end).ok_or(ProtocolError::BufferOverflow {
            offset: 0,
            len: end,
            capacity,
        })
    }

    // ------------------------------------------------------------------
    // Cursor control
    // ------------------------------------------------------------------

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Position the cursor on the first parameter word
    pub fn reset_parameter_pointer(&mut self) {
        self.pos = PARAM_WORDS;
    }

    /// Position the cursor on the byte area and bound it by the byte count
    pub fn reset_byte_pointer(&mut self) {
        self.pos = self.byte_offset();
        self.endpos = self.pos + usize::from(self.byte_count());
    }

    /// As [`SmbPacket::reset_byte_pointer`], longword aligned
    pub fn reset_byte_pointer_aligned(&mut self) {
        self.pos = packer::longword_align(self.byte_offset());
        self.endpos = self.pos + usize::from(self.byte_count());
    }

    /// Position the cursor on a chained (AndX) block
    pub fn set_byte_pointer(&mut self, offset: usize, len: usize) {
        self.pos = offset;
        self.endpos = offset + len;
    }

    /// Align the cursor on a 4-byte boundary
    pub fn align_byte_pointer(&mut self) {
        self.pos = packer::longword_align(self.pos);
    }

    pub fn skip(&mut self, cnt: usize) {
        self.pos += cnt;
    }

    pub fn has_more_data(&self) -> bool {
        self.pos < self.endpos
    }

    // ------------------------------------------------------------------
    // Packing
    // ------------------------------------------------------------------

    pub fn pack_u8(&mut self, val: u8) -> Result<()> {
        self.pos += packer::put_u8(val, &mut self.buf, self.pos)?;
        Ok(())
    }

    pub fn pack_u16(&mut self, val: u16) -> Result<()> {
        self.pos += packer::put_u16_le(val, &mut self.buf, self.pos)?;
        Ok(())
    }

    pub fn pack_u32(&mut self, val: u32) -> Result<()> {
        self.pos += packer::put_u32_le(val, &mut self.buf, self.pos)?;
        Ok(())
    }

    pub fn pack_u64(&mut self, val: u64) -> Result<()> {
        self.pos += packer::put_u64_le(val, &mut self.buf, self.pos)?;
        Ok(())
    }

    pub fn pack_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.pos += packer::put_bytes(bytes, &mut self.buf, self.pos)?;
        Ok(())
    }

    /// Pack a NUL terminated string. Unicode strings are word aligned first.
    pub fn pack_string(&mut self, s: &str, unicode: bool) -> Result<()> {
        if unicode {
            let aligned = packer::word_align(self.pos);
            if aligned > self.pos {
                packer::put_zeros(&mut self.buf, self.pos, aligned - self.pos)?;
            }
            let written = packer::put_utf16_string(s, &mut self.buf, aligned, true)?;
            self.pos = aligned + written;
        } else {
            self.pos += packer::put_ascii_string(s, &mut self.buf, self.pos, true)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Unpacking
    // ------------------------------------------------------------------

    pub fn unpack_u8(&mut self) -> Result<u8> {
        let val = packer::get_u8(&self.buf, self.pos)?;
        self.pos += 1;
        Ok(val)
    }

    pub fn unpack_u16(&mut self) -> Result<u16> {
        let val = packer::get_u16_le(&self.buf, self.pos)?;
        self.pos += 2;
        Ok(val)
    }

    pub fn unpack_u32(&mut self) -> Result<u32> {
        let val = packer::get_u32_le(&self.buf, self.pos)?;
        self.pos += 4;
        Ok(val)
    }

    pub fn unpack_u64(&mut self) -> Result<u64> {
        let val = packer::get_u64_le(&self.buf, self.pos)?;
        self.pos += 8;
        Ok(val)
    }

    pub fn unpack_bytes(&mut self, len: usize) -> Result<&[u8]> {
        let start = self.pos;
        packer::get_bytes(&self.buf, start, len)?;
        self.pos += len;
        Ok(&self.buf[start..start + len])
    }

    /// Unpack a NUL terminated string. Unicode strings are word aligned first.
    pub fn unpack_string(&mut self, unicode: bool) -> Result<String> {
        if unicode {
            let aligned = packer::word_align(self.pos);
            let (s, consumed) = packer::get_utf16_string(&self.buf, aligned, MAX_STRING_LEN)?;
            self.pos = aligned + consumed;
            Ok(s)
        } else {
            let (s, consumed) = packer::get_ascii_string(&self.buf, self.pos, MAX_STRING_LEN)?;
            self.pos += consumed;
            Ok(s)
        }
    }

    /// Unpack a string of at most `len` characters.
    ///
    /// The cursor advances by the characters read; a terminator is not consumed.
    pub fn unpack_string_len(&mut self, len: usize, unicode: bool) -> Result<String> {
        if unicode {
            let aligned = packer::word_align(self.pos);
            let (s, _) = packer::get_utf16_string(&self.buf, aligned, len)?;
            self.pos = aligned + s.encode_utf16().count() * 2;
            Ok(s)
        } else {
            let (s, _) = packer::get_ascii_string(&self.buf, self.pos, len)?;
            self.pos += s.chars().count();
            Ok(s)
        }
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    /// Decode the status field in the convention selected by flags2
    pub fn status(&self) -> SmbStatus {
        if self.is_long_error_code() {
            SmbStatus::NtStatus(self.long_error_code())
        } else {
            SmbStatus::Legacy {
                class: self.error_class(),
                code: self.error_code(),
            }
        }
    }

    /// True for a successful response to the command this packet expects
    pub fn is_success(&self) -> bool {
        if !self.is_response() || self.command() != self.command {
            return false;
        }
        if self.is_long_error_code() {
            self.long_error_code() == NT_SUCCESS
        } else {
            self.error_code() == LEGACY_SUCCESS
        }
    }

    /// Fail with the packet's status when it is not success in the selected
    /// convention. The response flag and command are not consulted; see
    /// [`SmbPacket::is_success`] for the stricter check.
    pub fn check_for_error(&self) -> Result<()> {
        let status = self.status();
        if status.is_success() {
            return Ok(());
        }
        Err(status.into())
    }

    pub fn equals_error(&self, class: u8, code: u8) -> bool {
        self.error_class() == class && self.error_code() == code
    }

    // ------------------------------------------------------------------
    // Send bookkeeping
    // ------------------------------------------------------------------

    pub fn last_send_time(&self) -> Option<Instant> {
        self.last_tx
    }

    pub(crate) fn mark_sent(&mut self, at: Instant) {
        self.last_tx = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command;
    use crate::core::status::{DOS_FILE_NOT_FOUND, ERR_DOS, NT_ACCESS_DENIED};

    fn response(cmd: u8) -> SmbPacket {
        let mut pkt = SmbPacket::new();
        pkt.set_command(cmd);
        pkt.set_flags(flags::RESPONSE);
        pkt
    }

    #[test]
    fn test_new_packet_has_marker() {
        let pkt = SmbPacket::new();
        assert!(pkt.has_smb_signature());
        assert_eq!(pkt.capacity(), DEFAULT_BUFFER_SIZE);
        assert_eq!(pkt.buffer_length(), DEFAULT_BUFFER_SIZE - HEADER_LEN);
        assert_eq!(&pkt.as_bytes()[4..8], b"\xFFSMB");
    }

    #[test]
    fn test_capacity_below_minimum_rejected() {
        assert!(SmbPacket::with_capacity(MIN_BUFFER_SIZE - 1).is_err());
        assert!(SmbPacket::with_capacity(MIN_BUFFER_SIZE).is_ok());
    }

    #[test]
    fn test_header_field_offsets() {
        let mut pkt = SmbPacket::new();
        pkt.set_command(command::NEGOTIATE);
        pkt.set_flags(0x18);
        pkt.set_flags2(0xC853);
        pkt.set_tree_id(0x1122);
        pkt.set_process_id(0x3344);
        pkt.set_user_id(0x5566);
        pkt.set_multiplex_id(0x7788);

        let raw = pkt.as_bytes();
        assert_eq!(raw[HEADER_LEN + 4], 0x72);
        assert_eq!(raw[HEADER_LEN + 9], 0x18);
        assert_eq!(&raw[HEADER_LEN + 10..HEADER_LEN + 12], &[0x53, 0xC8]);
        assert_eq!(&raw[HEADER_LEN + 24..HEADER_LEN + 26], &[0x22, 0x11]);
        assert_eq!(&raw[HEADER_LEN + 26..HEADER_LEN + 28], &[0x44, 0x33]);
        assert_eq!(&raw[HEADER_LEN + 28..HEADER_LEN + 30], &[0x66, 0x55]);
        assert_eq!(&raw[HEADER_LEN + 30..HEADER_LEN + 32], &[0x88, 0x77]);
    }

    #[test]
    fn test_byte_offset_tracks_parameter_count() {
        let mut pkt = SmbPacket::new();
        pkt.set_byte_count(0);
        assert_eq!(pkt.byte_offset(), HEADER_LEN + 35);

        pkt.set_parameter_count(3);
        assert_eq!(pkt.byte_offset(), HEADER_LEN + 35 + 6);

        // Byte count follows the parameter words, not a cached location
        pkt.set_byte_count(7);
        assert_eq!(pkt.read_u16(HEADER_LEN + 33 + 6), 7);
        assert_eq!(pkt.total_length(), 35 + 6 + 7);

        pkt.set_parameter_count(0);
        assert_eq!(pkt.byte_offset(), HEADER_LEN + 35);
    }

    #[test]
    fn test_parameter_index_boundary() {
        let mut pkt = SmbPacket::new();
        pkt.set_parameter_count(2);
        pkt.set_parameter(0, 10).unwrap();
        pkt.set_parameter(1, 20).unwrap();
        pkt.set_parameter(2, 30).unwrap();

        assert_eq!(pkt.parameter(0).unwrap(), 10);
        assert_eq!(pkt.parameter(1).unwrap(), 20);
        // One past the declared count is still readable
        assert_eq!(pkt.parameter(2).unwrap(), 30);
        assert!(matches!(
            pkt.parameter(3),
            Err(ProtocolError::ParameterIndex { index: 3, count: 2 })
        ));
    }

    #[test]
    fn test_parameter_long() {
        let mut pkt = SmbPacket::new();
        pkt.set_parameter_count(4);
        pkt.set_parameter_long(1, 0xDEAD_BEEF).unwrap();
        assert_eq!(pkt.parameter(1).unwrap(), 0xBEEF);
        assert_eq!(pkt.parameter(2).unwrap(), 0xDEAD);
        assert_eq!(pkt.parameter_long(1).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_pack_and_set_byte_count() {
        let mut pkt = SmbPacket::new();
        pkt.set_command(command::TREE_CONNECT_ANDX);
        pkt.set_parameter_count(4);
        pkt.reset_byte_pointer();
        pkt.pack_u8(0x04).unwrap();
        pkt.pack_string("\\\\SERVER\\SHARE", false).unwrap();
        pkt.pack_string("?????", false).unwrap();
        pkt.set_byte_count_from_position().unwrap();

        assert_eq!(pkt.byte_count(), 1 + 15 + 6);
        assert_eq!(pkt.total_length(), 35 + 8 + 22);

        pkt.reset_byte_pointer();
        assert_eq!(pkt.unpack_u8().unwrap(), 0x04);
        assert_eq!(pkt.unpack_string(false).unwrap(), "\\\\SERVER\\SHARE");
        assert_eq!(pkt.unpack_string(false).unwrap(), "?????");
        assert!(!pkt.has_more_data());
    }

    #[test]
    fn test_unicode_string_is_word_aligned() {
        let mut pkt = SmbPacket::new();
        pkt.reset_byte_pointer();
        let start = pkt.position();
        assert_eq!(start % 2, 1);

        pkt.pack_string("ab", true).unwrap();
        // One pad byte, two code units, terminator
        assert_eq!(pkt.position(), start + 1 + 4 + 2);

        pkt.set_position(start);
        assert_eq!(pkt.unpack_string(true).unwrap(), "ab");
        assert_eq!(pkt.position(), start + 7);
    }

    #[test]
    fn test_non_unicode_string_round_trips_latin1() {
        let mut pkt = SmbPacket::new();
        pkt.reset_byte_pointer();
        let start = pkt.position();

        pkt.pack_string("\u{e9}t\u{e9}", false).unwrap();
        assert_eq!(pkt.position(), start + 4);
        assert!(matches!(
            pkt.pack_string("\u{4e2d}", false),
            Err(ProtocolError::UnencodableChar(0x4E2D))
        ));
        assert_eq!(pkt.position(), start + 4);

        pkt.set_position(start);
        assert_eq!(pkt.unpack_string(false).unwrap(), "\u{e9}t\u{e9}");
    }

    #[test]
    fn test_fixed_length_string_does_not_consume_terminator() {
        let mut pkt = SmbPacket::new();
        pkt.reset_byte_pointer();
        let start = pkt.position();
        pkt.pack_bytes(b"NTFS\0rest").unwrap();

        pkt.set_position(start);
        assert_eq!(pkt.unpack_string_len(8, false).unwrap(), "NTFS");
        assert_eq!(pkt.position(), start + 4);
    }

    #[test]
    fn test_pack_past_capacity_fails() {
        let mut pkt = SmbPacket::with_capacity(MIN_BUFFER_SIZE).unwrap();
        pkt.set_position(MIN_BUFFER_SIZE - 2);
        pkt.pack_u16(1).unwrap();
        assert!(matches!(
            pkt.pack_u8(1),
            Err(ProtocolError::BufferOverflow { .. })
        ));
        assert!(pkt.unpack_u32().is_err());
        assert_eq!(pkt.position(), MIN_BUFFER_SIZE);
    }

    #[test]
    fn test_andx_block_pointer() {
        let mut pkt = SmbPacket::new();
        pkt.set_byte_pointer(100, 4);
        assert!(pkt.has_more_data());
        pkt.skip(4);
        assert!(!pkt.has_more_data());
    }

    #[test]
    fn test_andx_disable_clears_offset() {
        let mut pkt = SmbPacket::new();
        pkt.set_parameter_count(2);
        pkt.set_parameter(1, 0x40).unwrap();
        pkt.set_andx_command(command::NO_CHAINED_COMMAND);
        assert_eq!(pkt.andx_command(), 0xFF);
        assert_eq!(pkt.parameter(1).unwrap(), 0);
    }

    #[test]
    fn test_aligned_byte_pointer() {
        let mut pkt = SmbPacket::new();
        pkt.set_parameter_count(1);
        pkt.set_byte_count(10);
        pkt.reset_byte_pointer_aligned();
        assert_eq!(pkt.position() % 4, 0);
        assert!(pkt.position() >= pkt.byte_offset());
    }

    #[test]
    fn test_legacy_error_decoding() {
        let mut pkt = response(command::OPEN_ANDX);
        pkt.set_error_class(ERR_DOS);
        pkt.set_error_code(DOS_FILE_NOT_FOUND);

        assert!(!pkt.is_success());
        assert!(pkt.equals_error(1, 2));
        assert!(matches!(
            pkt.check_for_error(),
            Err(ProtocolError::SmbError { class: 1, code: 2 })
        ));
    }

    #[test]
    fn test_nt_status_decoding() {
        let mut pkt = response(command::NT_CREATE_ANDX);
        pkt.set_flags2(flags2::LONG_ERROR_CODE);
        pkt.set_long_error_code(NT_ACCESS_DENIED);

        assert_eq!(pkt.status(), SmbStatus::NtStatus(NT_ACCESS_DENIED));
        assert!(matches!(
            pkt.check_for_error(),
            Err(ProtocolError::NtStatus(0xC000_0022))
        ));
    }

    #[test]
    fn test_success_requires_matching_response() {
        let mut pkt = response(command::ECHO);
        assert!(pkt.check_for_error().is_ok());

        pkt.set_flags2(flags2::LONG_ERROR_CODE);
        assert!(pkt.is_success());

        // A request is never a successful response
        pkt.set_flags(0);
        assert!(!pkt.is_success());

        // Neither is a response to another command
        pkt.set_flags(flags::RESPONSE);
        pkt.expect_command(command::CLOSE_FILE);
        assert!(!pkt.is_success());
    }

    #[test]
    fn test_check_for_error_ignores_response_flag() {
        let mut pkt = SmbPacket::new();
        pkt.set_command(command::ECHO);
        assert!(!pkt.is_response());
        assert!(pkt.check_for_error().is_ok());

        pkt.set_flags2(flags2::LONG_ERROR_CODE);
        assert!(pkt.check_for_error().is_ok());

        pkt.expect_command(command::CLOSE_FILE);
        assert!(pkt.check_for_error().is_ok());
        assert!(!pkt.is_success());

        pkt.set_long_error_code(NT_ACCESS_DENIED);
        assert!(matches!(
            pkt.check_for_error(),
            Err(ProtocolError::NtStatus(0xC000_0022))
        ));

        pkt.set_flags2(0);
        pkt.set_error_class(ERR_DOS);
        pkt.set_error_code(DOS_FILE_NOT_FOUND);
        assert!(matches!(
            pkt.check_for_error(),
            Err(ProtocolError::SmbError { class: 1, code: 2 })
        ));
    }

    #[test]
    fn test_reset_clears_counts_and_cursor() {
        let mut pkt = response(command::READ_ANDX);
        pkt.set_parameter_count(12);
        pkt.set_byte_count(100);
        pkt.set_multiplex_id(9);
        pkt.skip(20);
        pkt.reset();

        assert!(pkt.has_smb_signature());
        assert_eq!(pkt.parameter_count(), 0);
        assert_eq!(pkt.byte_count(), 0);
        assert_eq!(pkt.multiplex_id(), 0);
        assert_eq!(pkt.flags(), 0);
        assert_eq!(pkt.position(), PARAM_WORDS);
        assert!(!pkt.has_more_data());
    }

    #[test]
    fn test_from_bytes() {
        let mut src = response(command::ECHO);
        src.set_byte_count(0);
        let pkt = SmbPacket::from_bytes(src.message().unwrap()).unwrap();
        assert_eq!(pkt.command(), command::ECHO);
        assert_eq!(pkt.expected_command(), command::ECHO);
        assert!(pkt.is_success());

        assert!(matches!(
            SmbPacket::from_bytes(&[0xFF, b'S', b'M', b'B']),
            Err(ProtocolError::ShortReceive(4))
        ));
        assert!(matches!(
            SmbPacket::from_bytes(&[0u8; 40]),
            Err(ProtocolError::InvalidHeader)
        ));
    }

    #[test]
    fn test_signature_overlaps_session_fields() {
        let mut pkt = SmbPacket::new();
        pkt.set_signature(0x0807_0605_0403_0201);
        assert_eq!(pkt.session_id(), 0x0605);
        assert_eq!(pkt.sequence_number(), 0x0807);
        pkt.set_signature_sequence(5);
        assert_eq!(pkt.signature_bytes(), [5, 0, 0, 0, 0, 0, 0, 0]);
    }
}
