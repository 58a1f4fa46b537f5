//! Bot token storage and log scrubbing
//!
//! The Telegram bot token is resolved from the `DOZIO_BOT_TOKEN` environment
//! variable first, then from the OS keychain:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (libsecret)
//!
//! The token never goes into config.toml. Anything that may echo it back
//! (transport errors, request URLs) is passed through [`SecretManager::scrub`]
//! before it is logged.

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::fmt;
use std::sync::OnceLock;

/// Keychain service namespace
pub const SERVICE_NAME: &str = "dozio";
/// Keychain entry holding the bot token
pub const TOKEN_KEY: &str = "telegram_bot_token";
/// Environment variable that overrides the keychain
pub const TOKEN_ENV: &str = "DOZIO_BOT_TOKEN";

/// Where a resolved token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    Keychain,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Environment => write!(f, "${}", TOKEN_ENV),
            TokenSource::Keychain => write!(f, "keychain"),
        }
    }
}

/// A Telegram bot token
///
/// `Debug` and `Display` always print `[REDACTED]`; use [`BotToken::expose`]
/// where the raw value is needed.
#[derive(Clone, PartialEq, Eq)]
pub struct BotToken(String);

impl BotToken {
    /// Validate the `<bot id>:<secret>` shape
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let raw = raw.trim();
        if token_shape().is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(EngineError::Validation(
                "bot token must look like <digits>:<secret>".to_string(),
            ))
        }
    }

    /// Access the raw token
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BotToken([REDACTED])")
    }
}

impl fmt::Display for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

static TOKEN_SHAPE: OnceLock<Regex> = OnceLock::new();
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn token_shape() -> &'static Regex {
    TOKEN_SHAPE
        .get_or_init(|| Regex::new(r"^\d{3,15}:[A-Za-z0-9_-]{20,}$").expect("Invalid token pattern"))
}

/// Patterns removed by [`SecretManager::scrub`]
///
/// - Telegram bot tokens, bare or inside a `/bot<token>/` URL path
/// - Bearer tokens
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"\d{3,15}:[A-Za-z0-9_-]{20,}").expect("Invalid Telegram pattern"),
            Regex::new(r"Bearer\s+[^\s]{20,}").expect("Invalid Bearer pattern"),
        ]
    })
}

/// Keychain access for the bot token
pub struct SecretManager {
    service_name: String,
}

impl Default for SecretManager {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl SecretManager {
    /// Creates a new SecretManager with the given keychain service name.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, EngineError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })
    }

    /// Resolve the bot token, environment first, then keychain
    ///
    /// # Errors
    /// `MissingToken` when neither source holds a value, `Validation` when
    /// the stored value is malformed.
    pub fn resolve_token(&self) -> Result<(BotToken, TokenSource), EngineError> {
        if let Ok(raw) = std::env::var(TOKEN_ENV) {
            if !raw.trim().is_empty() {
                tracing::debug!("Using bot token from {}", TOKEN_ENV);
                return Ok((BotToken::parse(&raw)?, TokenSource::Environment));
            }
        }

        match self.get_secret(TOKEN_KEY)? {
            Some(raw) => {
                tracing::debug!("Using bot token from keychain");
                Ok((BotToken::parse(&raw)?, TokenSource::Keychain))
            }
            None => Err(EngineError::MissingToken),
        }
    }

    /// Read a secret without prompting; `None` when it is not stored
    pub fn get_secret(&self, key: &str) -> Result<Option<String>, EngineError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Stores a secret in the OS keychain.
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        self.entry(key)?.set_password(value).map_err(|e| {
            EngineError::KeyringError(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    /// Deletes a secret from the OS keychain.
    pub fn delete_secret(&self, key: &str) -> Result<(), EngineError> {
        self.entry(key)?.delete_password().map_err(|e| {
            EngineError::KeyringError(format!("Failed to delete secret '{}': {}", key, e))
        })?;

        tracing::info!("Deleted secret '{}' from keychain", key);
        Ok(())
    }

    /// Checks if a secret exists in the OS keychain without prompting.
    pub fn has_secret(&self, key: &str) -> bool {
        matches!(self.get_secret(key), Ok(Some(_)))
    }

    /// Ask for the bot token on the terminal without echoing it
    ///
    /// The prompt goes to stderr so stdout stays clean for `--json` output.
    pub fn prompt_for_token(&self) -> Result<BotToken, EngineError> {
        let raw = rpassword::prompt_password_stderr("Telegram bot token: ")
            .map_err(|e| EngineError::KeyringError(format!("Failed to read input: {}", e)))?;

        if raw.trim().is_empty() {
            return Err(EngineError::MissingToken);
        }

        BotToken::parse(&raw)
    }

    /// Store a token under [`TOKEN_KEY`]
    pub fn store_token(&self, token: &BotToken) -> Result<(), EngineError> {
        self.set_secret(TOKEN_KEY, token.expose())
    }

    /// Replace anything that looks like a token with `[REDACTED]`
    ///
    /// # Examples
    /// ```
    /// use dozio_engine::secrets::SecretManager;
    ///
    /// let manager = SecretManager::default();
    /// let scrubbed = manager.scrub("GET /bot123456:ABCdefGHIjklMNOpqrSTUvwx/getUpdates");
    /// assert_eq!(scrubbed, "GET /bot[REDACTED]/getUpdates");
    /// ```
    pub fn scrub(&self, text: &str) -> String {
        get_secret_patterns()
            .iter()
            .fold(text.to_string(), |acc, pattern| {
                pattern.replace_all(&acc, "[REDACTED]").into_owned()
            })
    }
}
