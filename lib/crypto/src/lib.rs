//! Symmetric encryption primitives for courier.
//!
//! This crate provides:
//! - `EncryptionCodec`: AES-256-GCM encryption of message text at rest
//! - `Sealer`: an encrypt-only handle for components that never read back
//! - `EncryptionKey`: the single process-wide 32-byte key
//! - `constant_time_eq`: timing-safe comparison shared by the verifiers
//!
//! # Encoding
//!
//! Every binary field crosses the codec boundary as lowercase hex:
//! the key (64 chars), the IV (24 chars), the tag (32 chars) and the
//! ciphertext (twice the plaintext byte length).
//!
//! # Example
//!
//! ```
//! use courier_crypto::{EncryptionCodec, EncryptionKey};
//!
//! let key = EncryptionKey::from_hex(&"ab".repeat(32)).expect("valid key");
//! let codec = EncryptionCodec::new(&key);
//!
//! let sealed = codec.encrypt("Hello").expect("encrypts");
//! let opened = codec.decrypt(&sealed.ciphertext, &sealed.iv, &sealed.auth_tag);
//! assert_eq!(opened.as_deref(), Some("Hello"));
//! ```

pub mod codec;
pub mod compare;
pub mod error;
pub mod key;

pub use codec::{EncryptedPayload, EncryptionCodec, IV_LEN, Sealer, TAG_LEN};
pub use compare::constant_time_eq;
pub use error::CodecError;
pub use key::{EncryptionKey, KEY_LEN};
