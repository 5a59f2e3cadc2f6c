//! 测试替身，仅在 `test-utils` feature 下编译。

use crate::common::TimeFrame;
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use crate::market::port::MarketDataProvider;
use crate::notify::error::NotifyError;
use crate::notify::port::Notifier;
use crate::signal::entity::NotifyChannel;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// # Summary
/// 按 (标的, 周期) 预置序列的行情源。
///
/// # Logic
/// - 未预置的组合返回空序列，模拟 "数据缺失"。
/// - 被标记为失败的标的返回 `MarketError::Network`。
/// - 可设置每次请求的延迟，并记录同时进行中的请求数峰值。
#[derive(Default)]
pub struct MockProvider {
    series: DashMap<(String, TimeFrame), Vec<Candle>>,
    failing: DashSet<String>,
    fetches: AtomicUsize,
    delay_ms: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// 请求结束 (包括被取消) 时减少进行中计数
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置或替换某个组合的序列
    pub fn set_series(&self, symbol: &str, timeframe: TimeFrame, candles: Vec<Candle>) {
        self.series.insert((symbol.to_string(), timeframe), candles);
    }

    /// 让该标的之后的所有请求失败
    pub fn fail_symbol(&self, symbol: &str) {
        self.failing.insert(symbol.to_string());
    }

    /// 已发生的请求次数
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// 之后的每次请求先休眠 `delay`
    pub fn set_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delay_ms.store(millis, Ordering::SeqCst);
    }

    /// 同时进行中的请求数的历史峰值
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(&self.in_flight);
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.contains(symbol) {
            return Err(MarketError::Network(format!("mock failure for {}", symbol)));
        }
        let candles = self
            .series
            .get(&(symbol.to_string(), timeframe))
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        let skip = candles.len().saturating_sub(count);
        Ok(candles.into_iter().skip(skip).collect())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// # Summary
/// 记录所有发送内容的通知器，可切换为失败模式。
pub struct RecordingNotifier {
    channel: NotifyChannel,
    sent: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new(channel: NotifyChannel) -> Self {
        Self {
            channel,
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// 切换失败模式；失败时不会记录消息
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// 已成功发送的消息快照
    pub async fn sent(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn channel(&self) -> NotifyChannel {
        self.channel
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Network("mock transport down".to_string()));
        }
        self.sent.lock().await.push(text.to_string());
        Ok(())
    }
}
