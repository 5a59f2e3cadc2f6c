use super::error::StoreError;
use crate::signal::entity::{NotifyChannel, Signal, StoreStats, SymbolEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// # Summary
/// 信号持久化接口，是 "同一次突破至多一轮通知" 的去重机制所在。
///
/// # Invariants
/// - `(symbol, bos_time)` 在存储层唯一；并发插入同一身份时恰好一方成功。
/// - 所有 `mark_*` 以及 `update_pulled_back(true)` 都是单向翻转，重复调用无副作用。
/// - 不提供删除操作。
/// - 实现类必须保证线程安全 (`Send` + `Sync`)。
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// # Summary
    /// 插入新信号。
    ///
    /// # Logic
    /// 1. 以 `(symbol, bos_time)` 为身份写入一行。
    /// 2. 唯一约束冲突被吞掉并返回 `Ok(false)`，不向调用方报错。
    ///
    /// # Arguments
    /// * `signal` - 待插入的信号。
    ///
    /// # Returns
    /// * `Ok(true)` 新建了记录；`Ok(false)` 记录已存在。
    async fn insert(&self, signal: &Signal) -> Result<bool, StoreError>;

    /// # Summary
    /// 按身份读取当前记录。
    ///
    /// # Returns
    /// 存在返回 `Some(Signal)`，否则返回 `None`。
    async fn get(&self, symbol: &str, bos_time: DateTime<Utc>)
    -> Result<Option<Signal>, StoreError>;

    /// 标记 BOS 通知已送达
    async fn mark_bos_sent(&self, symbol: &str, bos_time: DateTime<Utc>) -> Result<(), StoreError>;

    /// 标记回踩 (Market Scan) 通知已送达
    async fn mark_market_sent(
        &self,
        symbol: &str,
        bos_time: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// 标记某个渠道至少成功送达过一次
    async fn mark_notified_channel(
        &self,
        symbol: &str,
        bos_time: DateTime<Utc>,
        channel: NotifyChannel,
    ) -> Result<(), StoreError>;

    /// # Summary
    /// 更新回踩标记。
    ///
    /// # Logic
    /// 1. `pulled_back == true` 时置位。
    /// 2. `pulled_back == false` 时不做任何修改，已置位的记录不会被重置。
    async fn update_pulled_back(
        &self,
        symbol: &str,
        bos_time: DateTime<Utc>,
        pulled_back: bool,
    ) -> Result<(), StoreError>;

    /// 按创建时间倒序列出最近的信号
    async fn list_recent(&self, limit: usize) -> Result<Vec<Signal>, StoreError>;

    /// 汇总统计，用于心跳报告
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

/// # Summary
/// 扫描标的池的持久化接口。
///
/// # Invariants
/// - `symbol` 唯一；重复添加为空操作。
#[async_trait]
pub trait SymbolStore: Send + Sync {
    /// # Summary
    /// 列出标的代码，按字母序。
    ///
    /// # Arguments
    /// * `enabled_only` - 为 true 时只返回启用的标的。
    async fn list_symbols(&self, enabled_only: bool) -> Result<Vec<String>, StoreError>;

    /// 读取单个标的的完整条目
    async fn get_symbol(&self, symbol: &str) -> Result<Option<SymbolEntry>, StoreError>;

    /// # Summary
    /// 添加标的 (INSERT OR IGNORE 语义)。
    ///
    /// # Returns
    /// * `Ok(true)` 新增；`Ok(false)` 已存在。
    async fn add_symbol(&self, symbol: &str, source: &str) -> Result<bool, StoreError>;

    /// 启用或停用标的；标的不存在时返回 `StoreError::NotFound`
    async fn set_enabled(&self, symbol: &str, enabled: bool) -> Result<(), StoreError>;
}
