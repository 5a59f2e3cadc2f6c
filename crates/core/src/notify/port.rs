use crate::notify::error::NotifyError;
use crate::signal::entity::NotifyChannel;
use async_trait::async_trait;

/// # Summary
/// 发送通知到外部系统的接口定义。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync` 以支持并发调用。
/// - 一个实例只对应一个渠道，`channel()` 在生命周期内不变。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 该实例投递到的渠道
    fn channel(&self) -> NotifyChannel;

    /// # Summary
    /// 发送一条已渲染好的文本消息。
    ///
    /// # Logic
    /// 1. 按目标平台要求包装消息。
    /// 2. 通过底层传输协议发送。
    ///
    /// # Arguments
    /// * `text` - 完整的消息正文。
    ///
    /// # Returns
    /// * 平台确认接收返回 `Ok(())`，否则返回 `Err(NotifyError)`。
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}
