//! Messaging transport
//!
//! Inbound events are normalised into [`Inbound`], routed, and the resulting
//! [`Response`] is delivered through a [`Transport`].

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use sdk::Reply;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, warn};

use crate::router::{Response, Router};

/// Who sent an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Numeric Telegram id
    pub id: i64,
    /// Telegram username, if the account has one
    pub username: Option<String>,
    pub full_name: String,
}

/// An event received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inbound {
    Text {
        chat_id: i64,
        sender: Sender,
        text: String,
    },
    Callback {
        chat_id: i64,
        sender: Sender,
        callback_id: String,
        data: String,
    },
}

impl Inbound {
    pub fn sender(&self) -> &Sender {
        match self {
            Inbound::Text { sender, .. } | Inbound::Callback { sender, .. } => sender,
        }
    }

    pub fn chat_id(&self) -> i64 {
        match self {
            Inbound::Text { chat_id, .. } | Inbound::Callback { chat_id, .. } => *chat_id,
        }
    }
}

/// Outbound side of a chat platform
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one message, with its keyboard if any
    async fn send_text(&self, chat_id: i64, reply: &Reply) -> Result<()>;

    /// Acknowledge a button press, optionally with a short notice
    async fn answer_callback(&self, callback_id: &str, notice: Option<&str>) -> Result<()>;
}

/// Send a response for `inbound`; failures are logged, not returned
pub async fn deliver(transport: &dyn Transport, inbound: &Inbound, response: &Response) {
    if let Inbound::Callback { callback_id, .. } = inbound {
        if let Err(e) = transport
            .answer_callback(callback_id, response.notice.as_deref())
            .await
        {
            warn!("Failed to answer callback {}: {}", callback_id, e);
        }
    }

    let chat_id = inbound.chat_id();
    for reply in &response.replies {
        if let Err(e) = transport.send_text(chat_id, reply).await {
            error!("Failed to send reply to {}: {}", chat_id, e);
        }
    }
}

/// Route and answer a batch of events
///
/// Events of one sender are handled in order; different senders run
/// concurrently.
pub async fn handle_batch(router: &Router, transport: Arc<dyn Transport>, events: Vec<Inbound>) {
    let mut per_sender: HashMap<i64, Vec<Inbound>> = HashMap::new();
    for event in events {
        per_sender.entry(event.sender().id).or_default().push(event);
    }

    let mut workers = JoinSet::new();
    for (_, queue) in per_sender {
        let router = router.clone();
        let transport = Arc::clone(&transport);
        workers.spawn(async move {
            for event in queue {
                let response = router.dispatch(&event).await;
                deliver(transport.as_ref(), &event, &response).await;
            }
        });
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            error!("Event worker panicked: {}", e);
        }
    }
}
