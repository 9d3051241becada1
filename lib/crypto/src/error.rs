//! Error types for the crypto crate.
//!
//! `Display` output never includes key material, plaintext or ciphertext.

use std::fmt;

/// Errors from key handling and the encryption codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// No key was configured.
    MissingKey,
    /// The configured key is not 32 bytes of hex.
    InvalidKey { reason: String },
    /// A hex field could not be decoded or has the wrong length.
    Malformed { field: &'static str },
    /// Authentication tag did not verify (tampering or wrong key).
    Integrity,
    /// Decrypted bytes are not valid UTF-8.
    NotUtf8,
    /// The cipher refused to encrypt the input.
    EncryptionFailed,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey => write!(f, "no encryption key configured"),
            Self::InvalidKey { reason } => write!(f, "invalid encryption key: {reason}"),
            Self::Malformed { field } => write!(f, "malformed encrypted field: {field}"),
            Self::Integrity => write!(f, "message failed integrity check"),
            Self::NotUtf8 => write!(f, "decrypted content is not valid UTF-8"),
            Self::EncryptionFailed => write!(f, "encryption failed"),
        }
    }
}

impl std::error::Error for CodecError {}
