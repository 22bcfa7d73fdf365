//! # Byte Packer
//!
//! Little-endian primitives used by the SMB packet layout.
//!
//! Every accessor takes an explicit offset and returns the exact number of bytes
//! it touched, so a cursor built on top of it can advance precisely. Any access
//! that would run past the end of the slice fails with
//! [`ProtocolError::BufferOverflow`]; nothing is silently truncated.
//!
//! Strings come in two flavours:
//! - **ASCII**: single byte characters, optionally NUL terminated
//! - **UTF-16**: little-endian code units, optionally NUL terminated. Word
//!   alignment is the caller's responsibility (see [`word_align`]).

use crate::error::{ProtocolError, Result};

#[inline]
fn check(buf: &[u8], offset: usize, len: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= buf.len() => Ok(()),
        _ => Err(ProtocolError::BufferOverflow {
            offset,
            len,
            capacity: buf.len(),
        }),
    }
}

/// Round a position up to the next even (word) boundary
#[inline]
pub const fn word_align(pos: usize) -> usize {
    (pos + 1) & !1
}

/// Round a position up to the next 4-byte (longword) boundary
#[inline]
pub const fn longword_align(pos: usize) -> usize {
    (pos + 3) & !3
}

pub fn get_u8(buf: &[u8], offset: usize) -> Result<u8> {
    check(buf, offset, 1)?;
    Ok(buf[offset])
}

pub fn put_u8(val: u8, buf: &mut [u8], offset: usize) -> Result<usize> {
    check(buf, offset, 1)?;
    buf[offset] = val;
    Ok(1)
}

pub fn get_u16_le(buf: &[u8], offset: usize) -> Result<u16> {
    check(buf, offset, 2)?;
    Ok(u16::from_le_bytes([buf[offset], buf[offset + 1]]))
}

pub fn put_u16_le(val: u16, buf: &mut [u8], offset: usize) -> Result<usize> {
    check(buf, offset, 2)?;
    buf[offset..offset + 2].copy_from_slice(&val.to_le_bytes());
    Ok(2)
}

pub fn get_u32_le(buf: &[u8], offset: usize) -> Result<u32> {
    check(buf, offset, 4)?;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    Ok(u32::from_le_bytes(raw))
}

pub fn put_u32_le(val: u32, buf: &mut [u8], offset: usize) -> Result<usize> {
    check(buf, offset, 4)?;
    buf[offset..offset + 4].copy_from_slice(&val.to_le_bytes());
    Ok(4)
}

pub fn get_u64_le(buf: &[u8], offset: usize) -> Result<u64> {
    check(buf, offset, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    Ok(u64::from_le_bytes(raw))
}

pub fn put_u64_le(val: u64, buf: &mut [u8], offset: usize) -> Result<usize> {
    check(buf, offset, 8)?;
    buf[offset..offset + 8].copy_from_slice(&val.to_le_bytes());
    Ok(8)
}

/// Copy raw bytes into the buffer
pub fn put_bytes(src: &[u8], buf: &mut [u8], offset: usize) -> Result<usize> {
    check(buf, offset, src.len())?;
    buf[offset..offset + src.len()].copy_from_slice(src);
    Ok(src.len())
}

/// Borrow `len` raw bytes from the buffer
pub fn get_bytes(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    check(buf, offset, len)?;
    Ok(&buf[offset..offset + len])
}

/// Zero `len` bytes starting at `offset`
pub fn put_zeros(buf: &mut [u8], offset: usize, len: usize) -> Result<usize> {
    check(buf, offset, len)?;
    buf[offset..offset + len].fill(0);
    Ok(len)
}

/// Read a single-byte string of at most `max_len` characters.
///
/// Each byte maps to the code point of the same value (ISO-8859-1). Stops at the first NUL. Returns the string and the number of bytes consumed,
/// which includes the terminator when one was found.
pub fn get_ascii_string(buf: &[u8], offset: usize, max_len: usize) -> Result<(String, usize)> {
    check(buf, offset, 0)?;
    let limit = offset.saturating_add(max_len).min(buf.len());
    let region = &buf[offset..limit];

    match region.iter().position(|&b| b == 0) {
        Some(nul) => Ok((region[..nul].iter().map(|&b| b as char).collect(), nul + 1)),
        None if limit == buf.len() && region.len() < max_len => {
            Err(ProtocolError::BufferOverflow {
                offset,
                len: region.len() + 1,
                capacity: buf.len(),
            })
        }
        None => Ok((region.iter().map(|&b| b as char).collect(), region.len())),
    }
}

/// Write a single-byte string, with an optional NUL terminator.
///
/// Characters are written as one ISO-8859-1 byte each, so the result reads
/// back unchanged through [`get_ascii_string`]. Fails with
/// [`ProtocolError::UnencodableChar`] above U+00FF, before anything is written.
/// Returns the number of bytes written.
pub fn put_ascii_string(s: &str, buf: &mut [u8], offset: usize, nul: bool) -> Result<usize> {
    if let Some(c) = s.chars().find(|&c| u32::from(c) > 0xFF) {
        return Err(ProtocolError::UnencodableChar(u32::from(c)));
    }
    let len = s.chars().count();
    let total = len + usize::from(nul);
    check(buf, offset, total)?;

    for (dst, c) in buf[offset..offset + len].iter_mut().zip(s.chars()) {
        *dst = u32::from(c) as u8;
    }
    if nul {
        buf[offset + len] = 0;
    }
    Ok(total)
}

/// Read a UTF-16LE string of at most `max_chars` code units.
///
/// Stops at the first NUL unit. Returns the string and the number of bytes
/// consumed, including the 2-byte terminator when one was found.
pub fn get_utf16_string(buf: &[u8], offset: usize, max_chars: usize) -> Result<(String, usize)> {
    check(buf, offset, 0)?;
    let mut units = Vec::with_capacity(max_chars.min(256));
    let mut pos = offset;

    while units.len() < max_chars {
        let unit = get_u16_le(buf, pos)?;
        pos += 2;
        if unit == 0 {
            let text = char::decode_utf16(units.iter().copied())
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect();
            return Ok((text, pos - offset));
        }
        units.push(unit);
    }

    let text = char::decode_utf16(units.iter().copied())
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    Ok((text, pos - offset))
}

/// Write a UTF-16LE string, with an optional NUL terminator.
///
/// Returns the number of bytes written.
pub fn put_utf16_string(s: &str, buf: &mut [u8], offset: usize, nul: bool) -> Result<usize> {
    let units = s.encode_utf16().count() + usize::from(nul);
    check(buf, offset, units * 2)?;

    let mut pos = offset;
    for unit in s.encode_utf16() {
        buf[pos..pos + 2].copy_from_slice(&unit.to_le_bytes());
        pos += 2;
    }
    if nul {
        buf[pos..pos + 2].fill(0);
        pos += 2;
    }
    Ok(pos - offset)
}
