//! Encrypted message relay between application users and external contacts.
//!
//! This crate provides:
//!
//! - **Model**: `Contact`, `Conversation`, `Message` and its metadata view
//! - **Store**: the `RelayStore` persistence seam and an in-memory store
//! - **Relay**: `ConversationRelay`, which seals and routes but cannot read
//! - **Bot**: `BotRelay`, the only surface that decrypts stored messages
//!
//! Anything serving admin or public HTTP traffic holds a
//! `ConversationRelay` and builds this crate without the `bot` feature, so
//! `BotRelay` does not exist in its dependency graph.

#[cfg(feature = "bot")]
pub mod bot;
pub mod conversation;
pub mod error;
pub mod message;
pub mod relay;
pub mod store;

#[cfg(feature = "bot")]
pub use bot::{BotRelay, Readable};
pub use conversation::{Contact, ContactStatus, Conversation};
pub use error::{ParseContactStatusError, ParseSenderTypeError, RelayError};
pub use message::{Message, MessageSummary, SenderType};
pub use relay::ConversationRelay;
pub use store::{MemoryRelayStore, RelayStore};
