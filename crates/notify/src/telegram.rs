use crate::SEND_TIMEOUT;
use async_trait::async_trait;
use kizashi_core::notify::error::NotifyError;
use kizashi_core::notify::port::Notifier;
use kizashi_core::signal::entity::NotifyChannel;
use serde::Serialize;
use tracing::debug;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// # Summary
/// A notifier implementation that sends messages via Telegram Bot API.
///
/// # Invariants
/// * `bot_token` must be valid.
/// * `chat_id` must be accessible by the bot.
/// * Messages are sent in HTML parse mode, so the text is escaped first.
pub struct TelegramNotifier {
    /// The Bot API token.
    bot_token: String,
    /// The target Chat ID.
    chat_id: String,
    /// Base URL of the Bot API, overridable for local testing.
    api_base: String,
    /// The HTTP client used for requests.
    client: reqwest::Client,
}

/// # Summary
/// Payload structure for Telegram `sendMessage` API.
#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
}

impl TelegramNotifier {
    /// # Summary
    /// Creates a new `TelegramNotifier`.
    ///
    /// # Arguments
    /// * `bot_token` - The Telegram Bot API token.
    /// * `chat_id` - The target chat ID to send messages to.
    ///
    /// # Returns
    /// * `Err(NotifyError::Config)` if either credential is blank or the client cannot be built.
    pub fn new(bot_token: String, chat_id: String) -> Result<Self, NotifyError> {
        Self::with_api_base(bot_token, chat_id, TELEGRAM_API)
    }

    /// Same as [`TelegramNotifier::new`] but targeting a custom API host.
    pub fn with_api_base(
        bot_token: String,
        chat_id: String,
        api_base: &str,
    ) -> Result<Self, NotifyError> {
        if bot_token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(NotifyError::Config(
                "telegram bot token and chat id are required".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Config(e.to_string()))?;

        Ok(Self {
            bot_token,
            chat_id,
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }
}

/// Escapes the three characters Telegram's HTML mode treats as markup.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> NotifyChannel {
        NotifyChannel::Telegram
    }

    /// # Summary
    /// Sends a message to the configured Telegram chat.
    ///
    /// # Logic
    /// 1. Constructs the Telegram API URL.
    /// 2. Escapes the text for HTML parse mode.
    /// 3. Sends a POST request to the Telegram API.
    /// 4. Checks the response status and returns success or failure.
    ///
    /// # Returns
    /// * `Ok(())` if the message was sent successfully.
    /// * `Err(NotifyError)` if a network error occurs or the API returns a non-success status.
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        let payload = TelegramMessage {
            chat_id: &self.chat_id,
            text: escape_html(text),
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Platform(format!(
                "Telegram API error ({}): {}",
                status, error_text
            )));
        }

        debug!(chat_id = %self.chat_id, "telegram message delivered");
        Ok(())
    }
}
