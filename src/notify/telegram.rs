use super::{BudgetAlert, Notifier};
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
pub const MAX_RETRIES: u8 = 8;
const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP_MS: u64 = 30_000;

#[derive(Clone)]
pub struct TelegramNotifier {
    api_base: String,
    token: String,
    chat_id: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            chat_id,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    /// `None` unless both `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` are non-empty.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        if token.trim().is_empty() || chat.trim().is_empty() {
            return None;
        }
        Some(Self::new(token.trim().to_string(), chat.trim().to_string()))
    }

    /// Point at a different Bot API host (self-hosted API server, tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.clamp(1, MAX_RETRIES);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    disable_web_page_preview: bool,
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, alert: &BudgetAlert) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: alert.message(),
            disable_web_page_preview: true,
        };
        let url = self.endpoint();

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            // The URL embeds the bot token; keep it out of error messages.
            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Telegram sendMessage HTTP error: {:?}", e.status()),
                },
                Err(e) => anyhow!("Telegram sendMessage request failed: {}", e.without_url()),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tokio::time::sleep(backoff(attempt)).await;
        }
    }
}

/// Delay after the `attempt`-th failure: 500ms doubling, capped at 30s.
fn backoff(attempt: u8) -> Duration {
    let factor = 2u64.saturating_pow(u32::from(attempt.saturating_sub(1)));
    Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(factor).min(BACKOFF_CAP_MS))
}
