//! Telegram Bot API transport (long polling).
//!
//! `/start` gets the greeting; every other text message goes through the
//! conversation handler in its own task, so one slow question never blocks
//! the next update.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use vidstat_core::config::TelegramConfig;

use crate::handler::{AppContext, GREETING};

/// Extra client-side slack on top of the long-poll timeout.
const POLL_SLACK_SECONDS: u64 = 10;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("BOT_TOKEN is not set")]
    MissingToken,

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Bot API error {code}: {description}")]
    Api { code: u16, description: String },
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        // the request URL carries the bot token
        TelegramError::Http(e.without_url())
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<Option<T>, TelegramError> {
        if self.ok {
            Ok(self.result)
        } else {
            Err(TelegramError::Api {
                code: self.error_code.unwrap_or(0),
                description: self.description.unwrap_or_default(),
            })
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

impl Update {
    /// Chat and text of a plain text message, if this update carries one.
    pub fn text_message(&self) -> Option<(i64, &str)> {
        let message = self.message.as_ref()?;
        Some((message.chat.id, message.text.as_deref()?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Serialize)]
struct GetUpdatesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str, poll_timeout_seconds: u64) -> Result<Self, TelegramError> {
        if token.trim().is_empty() {
            return Err(TelegramError::MissingToken);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(poll_timeout_seconds + POLL_SLACK_SECONDS))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token.trim()),
        })
    }

    pub fn from_env(config: &TelegramConfig) -> Result<Self, TelegramError> {
        let token = std::env::var("BOT_TOKEN").map_err(|_| TelegramError::MissingToken)?;
        Self::new(&config.api_url, &token, config.poll_timeout_seconds)
    }

    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_seconds: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let body = GetUpdatesRequest {
            offset,
            timeout: timeout_seconds,
            allowed_updates: &["message"],
        };

        let response: ApiResponse<Vec<Update>> = self
            .client
            .post(format!("{}/getUpdates", self.base_url))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        Ok(response.into_result()?.unwrap_or_default())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let response: ApiResponse<serde_json::Value> = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await?
            .json()
            .await?;

        response.into_result().map(|_| ())
    }
}

/// `/start`, `/start@SomeBot` and `/start payload` all count.
pub fn is_start_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or("");
    let command = command.split('@').next().unwrap_or("");
    command == "/start"
}

pub async fn reply_for(ctx: &AppContext, text: &str) -> String {
    if is_start_command(text) {
        GREETING.to_string()
    } else {
        ctx.on_message(text).await
    }
}

async fn handle_update(bot: Arc<TelegramClient>, ctx: Arc<AppContext>, chat_id: i64, text: String) {
    let reply = reply_for(&ctx, &text).await;
    if let Err(e) = bot.send_message(chat_id, &reply).await {
        tracing::error!(chat_id = chat_id, error = %e, "Failed to send reply");
    }
}

/// Poll for updates until a shutdown signal arrives.
pub async fn run_polling(
    bot: Arc<TelegramClient>,
    ctx: Arc<AppContext>,
    config: TelegramConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!("Telegram long polling started");
    let mut offset: Option<i64> = None;

    loop {
        let polled = tokio::select! {
            result = bot.get_updates(offset, config.poll_timeout_seconds) => result,
            _ = shutdown.recv() => break,
        };

        match polled {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    let Some((chat_id, text)) = update.text_message() else {
                        tracing::debug!(update_id = update.update_id, "Ignoring non-text update");
                        continue;
                    };
                    tracing::debug!(chat_id = chat_id, update_id = update.update_id, "Message received");
                    tokio::spawn(handle_update(
                        bot.clone(),
                        ctx.clone(),
                        chat_id,
                        text.to_string(),
                    ));
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "getUpdates failed, retrying");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(config.retry_delay_seconds)) => {}
                    _ = shutdown.recv() => break,
                }
            }
        }
    }

    tracing::info!("Telegram polling stopped");
}
