//! Telegram delivery channel.
//!
//! Sends messages via the Bot API's `sendMessage` method using HTML parse
//! mode. When Telegram rejects the markup, the message is retried once as
//! plain text so that an escaping bug degrades the alert instead of
//! dropping it. Transient transport failures are retried by the shared HTTP
//! middleware.

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::json;

use super::{error::NotificationError, Notifier};
use crate::{
    config::HttpRetryConfig,
    http_client::{build_http_client, HttpClientError},
};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Error payload returned by the Telegram Bot API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Sends alert messages to a single Telegram chat.
pub struct TelegramNotifier {
    api_base: String,
    bot_token: String,
    chat_id: String,
    client: ClientWithMiddleware,
}

impl TelegramNotifier {
    /// Creates a notifier for the given bot token and chat.
    pub fn new(
        bot_token: &str,
        chat_id: &str,
        retry: &HttpRetryConfig,
    ) -> Result<Self, HttpClientError> {
        Self::with_api_base(bot_token, chat_id, retry, TELEGRAM_API_BASE)
    }

    /// Creates a notifier pointed at a non-default API base URL. Used by
    /// tests to target a local mock server.
    pub fn with_api_base(
        bot_token: &str,
        chat_id: &str,
        retry: &HttpRetryConfig,
        api_base: &str,
    ) -> Result<Self, HttpClientError> {
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            client: build_http_client(retry)?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    /// Performs one `sendMessage` call, with or without HTML parse mode.
    async fn send_message(&self, text: &str, html: bool) -> Result<(), NotificationError> {
        let mut body = json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        if html {
            body["parse_mode"] = json!("HTML");
        }

        let response = self.client.post(self.endpoint()).json(&body).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let api: ApiResponse = response.json().await.map_err(|e| {
            NotificationError::Unexpected(format!("Failed to decode Telegram response: {e}"))
        })?;
        let description = api.description.unwrap_or_else(|| "no description".to_string());

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NotificationError::RateLimited {
                retry_after_secs: api.parameters.and_then(|p| p.retry_after),
            });
        }

        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(NotificationError::Rejected { description });
        }

        Err(NotificationError::Unexpected(format!("HTTP {status}: {description}")))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> bool {
        match self.send_message(message, true).await {
            Ok(()) => {
                tracing::info!(chat_id = %self.chat_id, "Alert sent successfully");
                true
            }
            Err(NotificationError::Rejected { description })
                if description.contains("can't parse entities") =>
            {
                tracing::warn!(
                    chat_id = %self.chat_id,
                    description = %description,
                    "Telegram rejected HTML markup, retrying as plain text"
                );
                match self.send_message(&strip_html(message), false).await {
                    Ok(()) => {
                        tracing::info!(chat_id = %self.chat_id, "Plain-text fallback sent");
                        true
                    }
                    Err(e) => {
                        tracing::error!(chat_id = %self.chat_id, error = %e, "Plain-text fallback failed");
                        false
                    }
                }
            }
            Err(e) => {
                tracing::error!(chat_id = %self.chat_id, error = %e, "Failed to send alert");
                false
            }
        }
    }
}

/// Strips HTML tags and unescapes entities for the plain-text fallback.
fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
