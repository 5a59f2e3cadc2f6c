use futures::future::join_all;
use kizashi_core::notify::entity::AlertPayload;
use kizashi_core::notify::port::Notifier;
use kizashi_core::signal::entity::NotifyChannel;
use std::sync::Arc;
use tracing::{info, warn};

/// # Summary
/// 将一条提醒并发投递到所有已配置的通知渠道。
///
/// # Invariants
/// - 单个渠道失败只记录日志，不影响其它渠道。
/// - 返回值只包含确认接收的渠道，调用方据此更新送达标记。
pub struct NotificationDispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotificationDispatcher {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    /// 已配置的渠道
    pub fn channels(&self) -> Vec<NotifyChannel> {
        self.notifiers.iter().map(|n| n.channel()).collect()
    }

    /// # Summary
    /// 渲染并投递提醒。
    ///
    /// # Logic
    /// 1. 渲染一次文本，所有渠道共用。
    /// 2. 没有任何渠道时只写日志，视为未送达。
    /// 3. 并发发送，收集成功的渠道。
    ///
    /// # Returns
    /// 确认接收的渠道列表；为空表示本次投递失败。
    pub async fn dispatch(&self, payload: &AlertPayload) -> Vec<NotifyChannel> {
        let text = payload.render();
        if self.notifiers.is_empty() {
            info!(kind = payload.kind(), "no notifier configured, alert logged only:\n{}", text);
            return Vec::new();
        }

        let results = join_all(self.notifiers.iter().map(|n| {
            let text = text.as_str();
            async move { (n.channel(), n.send(text).await) }
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(channel, result)| match result {
                Ok(()) => Some(channel),
                Err(e) => {
                    warn!(channel = %channel, kind = payload.kind(), error = %e, "alert delivery failed");
                    None
                }
            })
            .collect()
    }
}
