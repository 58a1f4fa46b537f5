//! Error types and handling
//!
//! This module provides the error types used throughout the Dozio engine.
//! All errors implement the `DozioErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry the bot token. Transport errors are scrubbed by
//! the engine before they are logged.

use thiserror::Error;

/// Trait for Dozio error extensions
///
/// Provides a hint that is safe to show to an operator or chat user, and
/// whether the failing operation may simply be retried.
pub trait DozioErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors need operator intervention (bad config, missing token).
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Validation**: Values outside their domain (role names, scores, reminder ranges)
/// - **Secrets**: Bot token absent or refused, keychain failures
/// - **Transport**: Messaging platform failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, DozioErrorExt};
///
/// let error = EngineError::Transport("connection reset".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::TokenRejected("Unauthorized".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Path canonicalization failed for {0:?}: {1}")]
    PathCanonicalization(std::path::PathBuf, String),

    // Domain errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Secret errors
    #[error("Bot token not configured")]
    MissingToken,

    #[error("Bot token rejected: {0}")]
    TokenRejected(String),

    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DozioErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::PathCanonicalization(_, _) => "Invalid path specified",
            Self::Validation(_) => "The value you entered is not valid",
            Self::MissingToken => "Run 'dozio setup' or set DOZIO_BOT_TOKEN",
            Self::TokenRejected(_) => "Get a fresh token from @BotFather and run 'dozio setup'",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Transport(_) => "Messaging platform unreachable. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::PathCanonicalization(_, _)
            | Self::MissingToken
            | Self::TokenRejected(_)
            | Self::KeyringError(_) => false,

            _ => true,
        }
    }
}
