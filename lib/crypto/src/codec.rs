//! AES-256-GCM codec for message content at rest.
//!
//! Each call to [`EncryptionCodec::encrypt`] draws a fresh 12-byte IV from
//! the operating system CSPRNG. The codec holds no mutable state, so a
//! single instance is shared freely across request tasks.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::key::EncryptionKey;

/// IV length in bytes.
pub const IV_LEN: usize = 12;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Hex-encoded output of one encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    /// Ciphertext without the tag.
    pub ciphertext: String,
    /// The 12-byte IV.
    pub iv: String,
    /// The 16-byte GCM tag.
    pub auth_tag: String,
}

/// Encrypts and decrypts UTF-8 text with one configured key.
#[derive(Clone)]
pub struct EncryptionCodec {
    cipher: Aes256Gcm,
}

impl EncryptionCodec {
    /// Creates a codec bound to `key`.
    #[must_use]
    pub fn new(key: &EncryptionKey) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypts `plaintext` under a freshly generated IV.
    ///
    /// # Errors
    ///
    /// Returns `EncryptionFailed` only if the cipher rejects the input
    /// length, which cannot happen for in-memory strings.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedPayload, CodecError> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| CodecError::EncryptionFailed)?;

        // aes-gcm appends the tag to the ciphertext.
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(EncryptedPayload {
            ciphertext: hex::encode(&sealed),
            iv: hex::encode(iv),
            auth_tag: hex::encode(tag),
        })
    }

    /// Decrypts a stored message, failing closed.
    ///
    /// Any malformed field, tampered byte or wrong key yields `None`.
    #[must_use]
    pub fn decrypt(&self, ciphertext: &str, iv: &str, auth_tag: &str) -> Option<String> {
        match self.open(ciphertext, iv, auth_tag) {
            Ok(plaintext) => Some(plaintext),
            Err(e) => {
                tracing::debug!(reason = %e, "decryption rejected");
                None
            }
        }
    }

    /// Decrypts with a typed failure reason, for callers that need to
    /// tell an integrity failure apart from malformed storage.
    ///
    /// # Errors
    ///
    /// `Malformed` for bad hex or wrong IV/tag length, `Integrity` when the
    /// tag does not verify, `NotUtf8` if the authenticated bytes are not
    /// text.
    pub fn open(&self, ciphertext: &str, iv: &str, auth_tag: &str) -> Result<String, CodecError> {
        let iv = decode_exact(iv, IV_LEN, "iv")?;
        let tag = decode_exact(auth_tag, TAG_LEN, "auth_tag")?;
        let mut sealed = hex::decode(ciphertext).map_err(|_| CodecError::Malformed {
            field: "ciphertext",
        })?;
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
            .map_err(|_| CodecError::Integrity)?;

        String::from_utf8(plaintext).map_err(|_| CodecError::NotUtf8)
    }

    /// Returns an encrypt-only handle sharing this codec's key.
    #[must_use]
    pub fn sealer(&self) -> Sealer {
        Sealer {
            codec: self.clone(),
        }
    }
}

/// Encrypt-only view of an [`EncryptionCodec`].
///
/// Components that store messages but must never read them back hold a
/// `Sealer` instead of the codec.
#[derive(Clone)]
pub struct Sealer {
    codec: EncryptionCodec,
}

impl Sealer {
    /// Encrypts `plaintext` under a freshly generated IV.
    ///
    /// # Errors
    ///
    /// See [`EncryptionCodec::encrypt`].
    pub fn seal(&self, plaintext: &str) -> Result<EncryptedPayload, CodecError> {
        self.codec.encrypt(plaintext)
    }
}

impl std::fmt::Debug for Sealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Sealer(<keyed>)")
    }
}

impl std::fmt::Debug for EncryptionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionCodec(<keyed>)")
    }
}

fn decode_exact(encoded: &str, len: usize, field: &'static str) -> Result<Vec<u8>, CodecError> {
    let bytes = hex::decode(encoded).map_err(|_| CodecError::Malformed { field })?;
    if bytes.len() != len {
        return Err(CodecError::Malformed { field });
    }
    Ok(bytes)
}
