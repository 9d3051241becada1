//! The process-wide symmetric key.
//!
//! There is no compiled-in fallback: a key must be supplied explicitly or
//! construction fails.

use crate::error::CodecError;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// A 32-byte AES-256 key, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Creates a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a key from 64 hex characters.
    ///
    /// # Errors
    ///
    /// Returns `MissingKey` for empty input and `InvalidKey` for anything
    /// that is not exactly 32 bytes of hex.
    pub fn from_hex(encoded: &str) -> Result<Self, CodecError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(CodecError::MissingKey);
        }

        let mut decoded = hex::decode(encoded).map_err(|e| CodecError::InvalidKey {
            reason: e.to_string(),
        })?;

        if decoded.len() != KEY_LEN {
            let reason = format!("expected {KEY_LEN} bytes, got {}", decoded.len());
            decoded.zeroize();
            return Err(CodecError::InvalidKey { reason });
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}
