//! courier HTTP server.
//!
//! Authenticates Telegram WebApp users, issues bearer tokens and exposes
//! relay metadata to admins. The server seals messages but never opens
//! them; decryption belongs to the bot integration.

pub mod admin;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
