//! Core domain types and utilities for courier.
//!
//! This crate provides the identifiers shared by the authentication,
//! encryption and relay crates.

pub mod id;

pub use id::{ContactId, ConversationId, MessageId, ParseIdError, UserId};
