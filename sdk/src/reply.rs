//! Outbound message vocabulary
//!
//! Everything the engine wants to say to a chat is expressed as a [`Reply`]:
//! a text plus an optional keyboard. Transports translate these into their
//! own wire format.

use serde::{Deserialize, Serialize};

/// A button that carries an opaque callback token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Keyboard attached to an outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "rows", rename_all = "snake_case")]
pub enum Keyboard {
    /// Persistent keyboard whose buttons send their label as text
    Reply(Vec<Vec<String>>),
    /// Buttons attached to the message, answered with a callback event
    Inline(Vec<Vec<InlineButton>>),
}

impl Keyboard {
    /// Build a reply keyboard from rows of labels
    pub fn reply<R, L>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Keyboard::Reply(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    /// Build an inline keyboard with one button per row
    pub fn inline_column(buttons: impl IntoIterator<Item = InlineButton>) -> Self {
        Keyboard::Inline(buttons.into_iter().map(|b| vec![b]).collect())
    }
}

/// A single outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    /// Plain text, no keyboard change
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    /// Text together with a keyboard
    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}
