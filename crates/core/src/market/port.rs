use crate::common::TimeFrame;
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use async_trait::async_trait;

/// # Summary
/// 市场行情数据提供者接口（原始数据源）。
///
/// # Invariants
/// - 返回的序列按时间升序，且最多 `count` 根，取最近的部分。
/// - 数据缺失可以表现为 `Ok(vec![])` 或 `Err(MarketError::NotFound)`，调用方同等对待。
/// - 进程内只存在一个实现，由启动器选定后以 `Arc<dyn MarketDataProvider>` 注入。
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// # Summary
    /// 获取特定标的最近的 K 线序列。
    ///
    /// # Logic
    /// 1. 将标的与周期映射为数据源识别的格式。
    /// 2. 执行请求或读取本地数据并解析。
    /// 3. 截取最近 `count` 根返回。
    ///
    /// # Arguments
    /// * `symbol`: 标的代码。
    /// * `timeframe`: K 线周期。
    /// * `count`: 需要的最大根数。
    ///
    /// # Returns
    /// 成功返回 K 线列表，失败返回 MarketError。
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError>;

    /// 数据源名称，仅用于日志
    fn name(&self) -> &'static str;
}
