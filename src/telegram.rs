use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

pub const PARSE_MODE_MARKDOWN: &str = "Markdown";

/// Body of a `sendMessage` call.
#[derive(Debug, Clone, Serialize)]
pub struct OutMessage<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    pub parse_mode: &'a str,
}

// Only the fields the relay reads are modelled. Absent or null fields fall
// back to their zero value instead of failing the decode.

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes the first JSON value in `body` and ignores whatever follows it.
/// A top-level `null` yields `T::default()`.
pub fn decode_first<T>(body: &[u8]) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned + Default,
{
    let mut values = serde_json::Deserializer::from_slice(body).into_iter::<Option<T>>();
    match values.next() {
        Some(value) => Ok(value?.unwrap_or_default()),
        None => Err(serde::de::Error::custom("EOF while parsing a value")),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
#[allow(dead_code)]
pub struct User {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
#[allow(dead_code)]
pub struct Chat {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub chat_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
#[allow(dead_code)]
pub struct Message {
    #[serde(deserialize_with = "null_as_default")]
    pub message_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub from: User,
    #[serde(deserialize_with = "null_as_default")]
    pub date: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub chat: Chat,
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
}

/// An inbound webhook update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Update {
    #[serde(deserialize_with = "null_as_default")]
    pub update_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub message: Message,
}

/// Anything that can deliver a text message to a chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()>;
}

pub struct TelegramClient {
    client: reqwest::Client,
    send_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            send_url: format!("{api_url}/bot{token}/sendMessage"),
        }
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    /// Only transport failures are errors. A non-2xx answer from Telegram
    /// (bad chat id, blocked bot, ...) is logged and treated as delivered.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let body = OutMessage {
            chat_id,
            text,
            parse_mode: PARSE_MODE_MARKDOWN,
        };

        debug!(chat_id, "Sending message to Telegram");

        let response = self
            .client
            .post(&self.send_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to send message to Telegram")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(chat_id, %status, "Telegram rejected sendMessage: {}", error_body);
        }

        Ok(())
    }
}
