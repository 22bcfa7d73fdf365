//! # Packet Signing
//!
//! Signatures cover the whole SMB message with the 8-byte signature field
//! replaced by the little-endian sequence number. The session owns the
//! sequence counter: a request is signed with `n` and its response verified
//! with `n + 1`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::core::packet::{HEADER_LEN, SIGNATURE};
use crate::error::{ProtocolError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Offset of the signature field within the SMB message
const SIG_START: usize = SIGNATURE - HEADER_LEN;
const SIG_END: usize = SIG_START + 8;

/// Computes and checks packet signatures for a signed session.
pub trait SigningProvider: Send + Sync {
    /// Signature for `message` (SMB bytes after the session header) at `sequence`
    fn sign(&self, message: &[u8], sequence: u32) -> [u8; 8];

    /// Check the signature embedded in `message` against `sequence`
    fn verify(&self, message: &[u8], sequence: u32) -> bool;
}

/// HMAC-SHA256 keyed by the session key, truncated to the signature field.
#[derive(Clone)]
pub struct HmacSigner {
    mac: HmacSha256,
}

impl HmacSigner {
    pub fn new(session_key: &[u8]) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(session_key)
            .map_err(|e| ProtocolError::ConfigError(format!("Invalid signing key: {e}")))?;
        Ok(Self { mac })
    }

    fn compute(&self, message: &[u8], sequence: u32) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(message.get(..SIG_START).unwrap_or(message));
        mac.update(&u64::from(sequence).to_le_bytes());
        if let Some(tail) = message.get(SIG_END..) {
            mac.update(tail);
        }
        mac
    }
}

impl SigningProvider for HmacSigner {
    fn sign(&self, message: &[u8], sequence: u32) -> [u8; 8] {
        let tag = self.compute(message, sequence).finalize().into_bytes();
        let mut signature = [0u8; 8];
        signature.copy_from_slice(&tag[..8]);
        signature
    }

    fn verify(&self, message: &[u8], sequence: u32) -> bool {
        match message.get(SIG_START..SIG_END) {
            Some(embedded) => self
                .compute(message, sequence)
                .verify_truncated_left(embedded)
                .is_ok(),
            None => false,
        }
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner").finish_non_exhaustive()
    }
}
