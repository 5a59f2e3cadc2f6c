//! # `kizashi-notify` - 通知渠道
//!
//! `Notifier` 的具体实现：Telegram Bot API 与 Twilio WhatsApp。

pub mod telegram;
pub mod whatsapp;

use std::time::Duration;

/// 推送请求的超时时间
pub(crate) const SEND_TIMEOUT: Duration = Duration::from_secs(10);
