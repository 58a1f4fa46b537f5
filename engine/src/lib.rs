//! Dozio Engine Library
//!
//! Core of the Dozio team task and reporting bot. It is used by both the
//! `dozio` binary and the integration tests.

/// Configuration management module
pub mod config;

/// Bot token storage and log scrubbing
pub mod secrets;

/// Database persistence module
pub mod db;

/// Multi-step conversation flows
pub mod conversation;

/// Menu and command routing
pub mod router;

/// Messaging transport and the Telegram bot
pub mod bot;

/// User-facing chat text
pub mod texts;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
