//! Telegram Bot API transport
//!
//! Long-polls `getUpdates`, turns text messages and button presses into
//! [`Inbound`] events and hands each batch to the router. Replies go out
//! through `sendMessage` and `answerCallbackQuery`.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use sdk::{DozioErrorExt, EngineError, InlineButton, Keyboard, Reply};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{handle_batch, Inbound, Sender, Transport};
use crate::config::TelegramConfig;
use crate::router::Router;
use crate::secrets::{BotToken, SecretManager};

/// Longest text Telegram accepts in one message
pub const MESSAGE_LIMIT: usize = 4096;

/// Headroom on top of the long-poll timeout before the HTTP client gives up
const CLIENT_SLACK: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct KeyboardButton<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ReplyKeyboardMarkup<'a> {
    keyboard: Vec<Vec<KeyboardButton<'a>>>,
    resize_keyboard: bool,
}

#[derive(Serialize)]
struct InlineKeyboardMarkup<'a> {
    inline_keyboard: &'a [Vec<InlineButton>],
}

#[derive(Serialize)]
#[serde(untagged)]
enum ReplyMarkup<'a> {
    Keyboard(ReplyKeyboardMarkup<'a>),
    Inline(InlineKeyboardMarkup<'a>),
}

impl<'a> ReplyMarkup<'a> {
    fn from_keyboard(keyboard: &'a Keyboard) -> Self {
        match keyboard {
            Keyboard::Reply(rows) => ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
                keyboard: rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|label| KeyboardButton { text: label.as_str() })
                            .collect()
                    })
                    .collect(),
                resize_keyboard: true,
            }),
            Keyboard::Inline(rows) => ReplyMarkup::Inline(InlineKeyboardMarkup {
                inline_keyboard: rows,
            }),
        }
    }
}

#[derive(Serialize)]
struct SendMessageReq<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup<'a>>,
}

#[derive(Serialize)]
struct AnswerCallbackReq<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Serialize)]
struct GetUpdatesReq<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<u16>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Update {
    update_id: i64,
    message: Option<Message>,
    callback_query: Option<CallbackQuery>,
}

#[derive(Deserialize, Debug)]
struct Message {
    chat: Chat,
    text: Option<String>,
    from: Option<User>,
}

#[derive(Deserialize, Debug)]
struct Chat {
    id: i64,
}

#[derive(Deserialize, Debug)]
struct User {
    id: i64,
    #[serde(default)]
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
}

impl User {
    fn into_sender(self) -> Sender {
        let full_name = match self.last_name {
            Some(last) => format!("{} {}", self.first_name, last).trim().to_string(),
            None => self.first_name.trim().to_string(),
        };
        Sender {
            id: self.id,
            username: self.username,
            full_name,
        }
    }
}

#[derive(Deserialize, Debug)]
struct CallbackQuery {
    id: String,
    from: User,
    message: Option<Message>,
    data: Option<String>,
}

/// Identity of the bot account, from `getMe`
#[derive(Deserialize, Debug, Clone)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
}

/// Map one update to an event; anything but text messages and button
/// presses is dropped
fn into_inbound(update: Update) -> Option<Inbound> {
    if let Some(msg) = update.message {
        let text = msg.text?;
        let sender = msg.from?.into_sender();
        return Some(Inbound::Text {
            chat_id: msg.chat.id,
            sender,
            text,
        });
    }

    if let Some(query) = update.callback_query {
        let chat_id = query
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .unwrap_or(query.from.id);
        return Some(Inbound::Callback {
            chat_id,
            sender: query.from.into_sender(),
            callback_id: query.id,
            data: query.data.unwrap_or_default(),
        });
    }

    None
}

/// Split text into pieces of at most `limit` UTF-16 code units, preferring
/// line breaks
///
/// Telegram measures message length in UTF-16, so emoji outside the Basic
/// Multilingual Plane count twice. The limit is raised to 2 so a single
/// surrogate pair always fits.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(2);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.encode_utf16().count();
        if current_len > 0 && current_len + line_len > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        for c in line.chars() {
            let width = c.len_utf16();
            if current_len + width > limit {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(c);
            current_len += width;
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[derive(Clone)]
pub struct TelegramBot {
    token: BotToken,
    api_base: String,
    client: Client,
    poll_timeout: Duration,
    retry_delay: Duration,
    secret_manager: Arc<SecretManager>,
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("api_base", &self.api_base)
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

impl TelegramBot {
    pub fn new(token: BotToken, config: &TelegramConfig) -> Self {
        let poll_timeout = Duration::from_secs(config.poll_timeout_secs);
        Self {
            token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(poll_timeout + CLIENT_SLACK)
                .build()
                .unwrap_or_default(),
            poll_timeout,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            secret_manager: Arc::new(SecretManager::default()),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token.expose(), method)
    }

    /// POST a Bot API method and unwrap its `result`
    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !response.ok {
            let description = response
                .description
                .unwrap_or_else(|| "ok=false".to_string());
            // 401 and 404 both mean the token in the URL is not a live bot
            return Err(match response.error_code {
                Some(401) | Some(404) => {
                    EngineError::TokenRejected(format!("{} returned {}", method, description))
                }
                _ => EngineError::Transport(format!("Telegram {} failed: {}", method, description)),
            }
            .into());
        }

        response.result.ok_or_else(|| {
            EngineError::Transport(format!("Telegram {} returned no result", method)).into()
        })
    }

    fn transport_error(&self, e: &reqwest::Error) -> EngineError {
        EngineError::Transport(self.secret_manager.scrub(&e.to_string()))
    }

    /// Check the token and return the bot account
    pub async fn get_me(&self) -> Result<BotIdentity> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Fetch events after `offset`; returns the next offset with the events
    pub async fn poll(&self, offset: i64) -> Result<(i64, Vec<Inbound>)> {
        let req = GetUpdatesReq {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: &["message", "callback_query"],
        };
        let updates: Vec<Update> = self.call("getUpdates", &req).await?;

        let next = updates
            .iter()
            .map(|u| u.update_id + 1)
            .max()
            .unwrap_or(offset)
            .max(offset);
        let events = updates.into_iter().filter_map(into_inbound).collect();
        Ok((next, events))
    }

    /// Long-poll until a fatal error, routing every batch
    ///
    /// Recoverable poll failures are logged and retried after the configured
    /// delay. A rejected token ends the loop with the error.
    pub async fn run(self: Arc<Self>, router: Router) -> Result<()> {
        info!("Starting Telegram long-polling loop via {}", self.api_base);
        let transport: Arc<dyn Transport> = Arc::<Self>::clone(&self);
        let mut offset = 0;

        loop {
            match self.poll(offset).await {
                Ok((next, events)) => {
                    offset = next;
                    if !events.is_empty() {
                        debug!("Received {} events", events.len());
                        handle_batch(&router, Arc::clone(&transport), events).await;
                    }
                }
                Err(e) => {
                    let fatal = e
                        .downcast_ref::<EngineError>()
                        .is_some_and(|err| !err.is_recoverable());
                    error!(
                        "Failed to fetch Telegram updates: {}",
                        self.secret_manager.scrub(&format!("{:#}", e))
                    );
                    if fatal {
                        return Err(e);
                    }
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl Transport for TelegramBot {
    async fn send_text(&self, chat_id: i64, reply: &Reply) -> Result<()> {
        let chunks = split_message(&reply.text, MESSAGE_LIMIT);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let req = SendMessageReq {
                chat_id,
                text: chunk,
                reply_markup: if i == last {
                    reply.keyboard.as_ref().map(ReplyMarkup::from_keyboard)
                } else {
                    None
                },
            };
            let _: serde_json::Value = self.call("sendMessage", &req).await?;
        }
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, notice: Option<&str>) -> Result<()> {
        let req = AnswerCallbackReq {
            callback_query_id: callback_id,
            text: notice,
        };
        let _: bool = self.call("answerCallbackQuery", &req).await?;
        Ok(())
    }
}
