//! # Error Types
//!
//! Comprehensive error handling for the SMB protocol core.
//!
//! This module defines all error variants that can occur while packing, unpacking
//! and exchanging SMB packets, from low-level I/O errors to SMB status codes
//! returned by the server.
//!
//! ## Error Categories
//! - **Transport Errors**: Connection closed/reset, write failures, timeouts
//! - **Malformed Responses**: Short receives, bad NetBIOS frames, oversized frames
//! - **Protocol Errors**: Legacy class/code errors and 32-bit NT status errors,
//!   kept as distinct variants so callers can branch on them
//! - **Signing Errors**: Received packet signature did not verify
//! - **Bounds Errors**: Buffer overflows and parameter index violations
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! ## Example Usage
//! ```rust
//! use smb_protocol::error::{ProtocolError, Result};
//! use smb_protocol::core::status::{ERR_DOS, DOS_FILE_NOT_FOUND};
//!
//! fn open(found: bool) -> Result<()> {
//!     if found {
//!         Ok(())
//!     } else {
//!         Err(ProtocolError::SmbError { class: ERR_DOS, code: DOS_FILE_NOT_FOUND })
//!     }
//! }
//!
//! match open(false) {
//!     Err(ProtocolError::SmbError { class, code }) => assert_eq!((class, code), (1, 2)),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use crate::core::status::SmbStatus;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Framing errors
    pub const ERR_INVALID_FRAME_TYPE: &str = "Unexpected NetBIOS session frame type";
    pub const ERR_RECEIVE_BUFFER_TOO_SMALL: &str = "Receive buffer too small for frame";

    /// Buffer errors
    pub const ERR_BUFFER_TOO_SMALL: &str = "Packet buffer smaller than the minimum SMB header";
}

// ProtocolError is the primary error type for all SMB operations
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Short NetBIOS receive: {0} bytes")]
    ShortReceive(usize),

    #[error("SMB error class {class}, code {code}")]
    SmbError { class: u8, code: u8 },

    #[error("NT status error: 0x{0:08X}")]
    NtStatus(u32),

    #[error("SMB signature verification failed")]
    SignatureMismatch,

    #[error("Parameter index {index} out of range (count {count})")]
    ParameterIndex { index: usize, count: u8 },

    #[error("Buffer overflow: {len} bytes at offset {offset} exceeds capacity {capacity}")]
    BufferOverflow {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    #[error("Invalid protocol header")]
    InvalidHeader,

    #[error("No handler registered for SMB command 0x{0:02X}")]
    UnexpectedCommand(u8),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Character U+{0:04X} cannot be packed as a single-byte string")]
    UnencodableChar(u32),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// True for errors that leave the underlying connection unusable
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(_)
                | ProtocolError::TransportError(_)
                | ProtocolError::ConnectionClosed
                | ProtocolError::Timeout
        )
    }

    /// The SMB status carried by a protocol-level error, if any
    pub fn smb_status(&self) -> Option<SmbStatus> {
        match *self {
            ProtocolError::SmbError { class, code } => Some(SmbStatus::Legacy { class, code }),
            ProtocolError::NtStatus(code) => Some(SmbStatus::NtStatus(code)),
            _ => None,
        }
    }
}

impl From<SmbStatus> for ProtocolError {
    fn from(status: SmbStatus) -> Self {
        match status {
            SmbStatus::Legacy { class, code } => ProtocolError::SmbError { class, code },
            SmbStatus::NtStatus(code) => ProtocolError::NtStatus(code),
        }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_conversion_keeps_kinds_apart() {
        let legacy: ProtocolError = SmbStatus::Legacy { class: 1, code: 2 }.into();
        let nt: ProtocolError = SmbStatus::NtStatus(0xC000_0022).into();

        assert!(matches!(legacy, ProtocolError::SmbError { class: 1, code: 2 }));
        assert!(matches!(nt, ProtocolError::NtStatus(0xC000_0022)));
        assert_eq!(
            nt.smb_status(),
            Some(SmbStatus::NtStatus(0xC000_0022))
        );
    }

    #[test]
    fn test_transport_failure_classification() {
        assert!(ProtocolError::ConnectionClosed.is_transport_failure());
        assert!(ProtocolError::Timeout.is_transport_failure());
        assert!(!ProtocolError::ShortReceive(12).is_transport_failure());
        assert!(!ProtocolError::SignatureMismatch.is_transport_failure());
    }

    #[test]
    fn test_display_carries_exact_codes() {
        let err = ProtocolError::SmbError { class: 1, code: 2 };
        assert_eq!(err.to_string(), "SMB error class 1, code 2");

        let err = ProtocolError::NtStatus(0xC000_0022);
        assert_eq!(err.to_string(), "NT status error: 0xC0000022");
    }
}
