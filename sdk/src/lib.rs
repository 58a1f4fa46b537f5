//! Dozio SDK
//!
//! Shared vocabulary for Dozio components: roles, reminder policies, scores,
//! outbound replies and the error taxonomy. Nothing here performs I/O.

/// Error types and handling
pub mod errors;

/// Outbound reply and keyboard types
pub mod reply;

/// Domain value types
pub mod types;

// Re-export commonly used types
pub use errors::{DozioErrorExt, EngineError};
pub use reply::{InlineButton, Keyboard, Reply};
pub use types::{ReminderKind, ReminderPolicy, Role, Score};
