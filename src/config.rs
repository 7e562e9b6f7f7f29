use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::warn;

pub const TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const KEY_VAR: &str = "TELEGRAM_BOT_KEY";
pub const API_URL_VAR: &str = "TELEGRAM_API_URL";
pub const BIND_ADDR_VAR: &str = "BIND_ADDR";

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Bot credentials. Read once at startup and never mutated.
#[derive(Clone, PartialEq)]
pub struct BotConfig {
    pub token: String,
    /// Shared secret callers of `/api/messages` must present.
    pub key: String,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &redact(&self.token))
            .field("key", &redact(&self.key))
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot: BotConfig,
    pub api_url: String,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    ///
    /// Missing credentials become empty strings; they are reported but
    /// do not stop startup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(TOKEN_VAR).unwrap_or_default();
        let key = lookup(KEY_VAR).unwrap_or_default();

        if token.is_empty() {
            warn!("{TOKEN_VAR} is not set; outbound sends will be rejected by Telegram");
        }
        if key.is_empty() {
            warn!("{KEY_VAR} is not set; every /api/messages request will be refused");
        }

        let api_url = lookup(API_URL_VAR)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(default_api_url);

        let bind_addr = match lookup(BIND_ADDR_VAR).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid {BIND_ADDR_VAR}: {raw}"))?,
            None => default_bind_addr(),
        };

        Ok(Self {
            bot: BotConfig { token, key },
            api_url,
            bind_addr,
        })
    }
}
