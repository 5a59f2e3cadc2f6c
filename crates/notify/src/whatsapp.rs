use crate::SEND_TIMEOUT;
use async_trait::async_trait;
use kizashi_core::notify::error::NotifyError;
use kizashi_core::notify::port::Notifier;
use kizashi_core::signal::entity::NotifyChannel;
use tracing::debug;

const TWILIO_API: &str = "https://api.twilio.com";

/// # Summary
/// 通过 Twilio Messages API 发送 WhatsApp 消息。
///
/// # Invariants
/// - `from` / `to` 需带 `whatsapp:` 前缀；缺少时自动补齐。
/// - 使用 Account SID + Auth Token 做 HTTP Basic 认证。
pub struct WhatsAppNotifier {
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
    api_base: String,
    client: reqwest::Client,
}

impl WhatsAppNotifier {
    /// # Summary
    /// 创建 Twilio WhatsApp 通知器。
    ///
    /// # Arguments
    /// * `account_sid` - Twilio 账号 SID。
    /// * `auth_token` - Twilio Auth Token。
    /// * `from` - 发送方号码，如 `whatsapp:+14155238886`。
    /// * `to` - 接收方号码。
    ///
    /// # Returns
    /// 任一参数为空时返回 `NotifyError::Config`。
    pub fn new(
        account_sid: String,
        auth_token: String,
        from: String,
        to: String,
    ) -> Result<Self, NotifyError> {
        Self::with_api_base(account_sid, auth_token, from, to, TWILIO_API)
    }

    /// 指定 API 地址，供本地测试使用
    pub fn with_api_base(
        account_sid: String,
        auth_token: String,
        from: String,
        to: String,
        api_base: &str,
    ) -> Result<Self, NotifyError> {
        if [&account_sid, &auth_token, &from, &to]
            .iter()
            .any(|v| v.trim().is_empty())
        {
            return Err(NotifyError::Config(
                "twilio sid, token, from and to are required".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Config(e.to_string()))?;

        Ok(Self {
            account_sid,
            auth_token,
            from: whatsapp_address(&from),
            to: whatsapp_address(&to),
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }
}

/// 补齐 `whatsapp:` 前缀
fn whatsapp_address(number: &str) -> String {
    let number = number.trim();
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    fn channel(&self) -> NotifyChannel {
        NotifyChannel::WhatsApp
    }

    /// # Summary
    /// 以表单方式提交一条消息。
    ///
    /// # Logic
    /// 1. POST `/2010-04-01/Accounts/{sid}/Messages.json`，字段 Body / From / To。
    /// 2. 非 2xx 响应转为 `NotifyError::Platform`。
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );
        let form = [
            ("Body", text),
            ("From", self.from.as_str()),
            ("To", self.to.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Platform(format!(
                "Twilio API error ({}): {}",
                status, error_text
            )));
        }

        debug!(to = %self.to, "whatsapp message accepted by twilio");
        Ok(())
    }
}
