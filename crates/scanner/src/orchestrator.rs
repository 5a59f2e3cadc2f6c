use crate::dispatch::NotificationDispatcher;
use crate::error::ScanError;
use kizashi_analysis::{
    AnalysisError, BosParams, LevelParams, atr, compute_levels, detect_bos, is_pulled_back,
};
use kizashi_core::common::TimeFrame;
use kizashi_core::common::time::TimeProvider;
use kizashi_core::config::ScannerConfig;
use kizashi_core::market::entity::Candle;
use kizashi_core::market::error::MarketError;
use kizashi_core::market::port::MarketDataProvider;
use kizashi_core::notify::entity::{
    AlertLevels, AlertPayload, BosAlert, MarketAlert, StatusReport,
};
use kizashi_core::signal::entity::{Direction, NotifyChannel, Signal};
use kizashi_core::store::error::StoreError;
use kizashi_core::store::port::{SignalStore, SymbolStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

const BOS_STATUS: &str = "Waiting for pullback";
const MARKET_STATUS: &str = "Waiting for entry";

/// # Summary
/// 扫描流水线的运行参数，由 `ScannerConfig` 转换而来。
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub htf: TimeFrame,
    pub ltf: TimeFrame,
    pub htf_count: usize,
    pub ltf_count: usize,
    pub bos: BosParams,
    pub levels: LevelParams,
    pub atr_period: usize,
    // 每 N 轮发送一次状态报告，0 表示关闭
    pub heartbeat_every: u64,
    // 回踩提醒的最低盈亏比，0 表示不过滤
    pub min_rr_alert: f64,
    // 两轮扫描之间的休眠，从上一轮结束时开始计
    pub scan_interval: Duration,
}

impl ScanSettings {
    pub fn from_config(cfg: &ScannerConfig) -> Self {
        Self {
            htf: cfg.htf,
            ltf: cfg.ltf,
            htf_count: cfg.htf_count,
            ltf_count: cfg.ltf_count,
            bos: BosParams {
                left: cfg.swing_left,
                right: cfg.swing_right,
                lookback: cfg.lookback,
            },
            levels: LevelParams {
                low_frac: cfg.retracement_low,
                high_frac: cfg.retracement_high,
                atr_buffer: cfg.atr_stop_buffer,
            },
            atr_period: cfg.atr_period,
            heartbeat_every: cfg.heartbeat_every,
            min_rr_alert: cfg.min_rr_alert,
            scan_interval: Duration::from_secs(cfg.scan_interval_secs),
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

/// # Summary
/// 单个标的一次流水线运行的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// 任一周期的数据缺失或为空
    NoData,
    /// 高周期没有结构突破
    NoBreak,
    /// ATR 无法计算
    NoAtr,
    /// 价位推导退化，本轮跳过
    Degenerate,
    Processed {
        // 本轮新建了信号记录
        inserted: bool,
        pulled_back: bool,
        bos_sent: bool,
        market_sent: bool,
    },
}

/// # Summary
/// 一轮完整扫描的汇总。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub symbols: usize,
    pub processed: usize,
    pub failed: usize,
    pub bos_alerts: usize,
    pub market_alerts: usize,
    pub elapsed: Duration,
}

impl CycleReport {
    fn record(&mut self, outcome: ScanOutcome) {
        if let ScanOutcome::Processed {
            bos_sent,
            market_sent,
            ..
        } = outcome
        {
            self.processed += 1;
            self.bos_alerts += usize::from(bos_sent);
            self.market_alerts += usize::from(market_sent);
        }
    }
}

/// # Summary
/// 扫描编排器：对每个启用的标的执行 "取数 → 检测 → 推导 → 回踩判定 → 持久化 → 通知" 流水线。
/// 编译期只依赖 `kizashi-core` 中的 Trait，具体实现由启动器注入。
///
/// # Invariants
/// - 周期扫描与临时触发共用同一个 `limiter`，同时运行的流水线不超过其许可数。
/// - 同一突破至多成功发送一次 BOS 提醒与一次回踩提醒，去重依赖存储层的唯一身份与单向标记。
/// - 单个标的的任何失败只记录日志，不影响同一轮的其它标的。
pub struct ScanOrchestrator {
    provider: Arc<dyn MarketDataProvider>,
    signals: Arc<dyn SignalStore>,
    symbols: Arc<dyn SymbolStore>,
    dispatcher: Arc<NotificationDispatcher>,
    limiter: Arc<Semaphore>,
    clock: Arc<dyn TimeProvider>,
    settings: ScanSettings,
    // 已完成的轮数，用于心跳
    cycles: AtomicU64,
}

impl ScanOrchestrator {
    /// # Summary
    /// 创建编排器实例。
    ///
    /// # Arguments
    /// * `provider` - 行情源，进程内唯一。
    /// * `signals` - 信号存储。
    /// * `symbols` - 标的池存储。
    /// * `dispatcher` - 通知分发器。
    /// * `limiter` - 并发上限，由调用方创建并可与其它组件共享。
    /// * `clock` - 时间供给器。
    /// * `settings` - 流水线参数。
    ///
    /// # Returns
    /// * `Arc<Self>` - 可共享的编排器实例。
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        signals: Arc<dyn SignalStore>,
        symbols: Arc<dyn SymbolStore>,
        dispatcher: Arc<NotificationDispatcher>,
        limiter: Arc<Semaphore>,
        clock: Arc<dyn TimeProvider>,
        settings: ScanSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            signals,
            symbols,
            dispatcher,
            limiter,
            clock,
            settings,
            cycles: AtomicU64::new(0),
        })
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// # Summary
    /// 对单个标的执行一次完整流水线 (不占用并发许可)。
    ///
    /// # Logic
    /// 1. 拉取高、低周期序列；任一缺失则直接返回 `NoData`，不写库不通知。
    /// 2. 高周期检测 BOS，计算 ATR，推导价位。
    /// 3. 以低周期最后一根 K 线判定回踩。
    /// 4. 幂等插入后读回存储记录，以存储中的标记为准。
    /// 5. BOS 尚未送达则发送 BOS 提醒，至少一个渠道接收后置位。
    /// 6. 已回踩则置位 `pulled_back`；回踩提醒尚未送达且盈亏比达标时发送。
    ///
    /// # Returns
    /// 本次运行的 `ScanOutcome`；行情或存储异常返回 `ScanError`。
    pub async fn scan_symbol(&self, symbol: &str) -> Result<ScanOutcome, ScanError> {
        let s = &self.settings;
        let Some(htf) = self.fetch(symbol, s.htf, s.htf_count).await? else {
            return Ok(ScanOutcome::NoData);
        };
        let Some(ltf) = self.fetch(symbol, s.ltf, s.ltf_count).await? else {
            return Ok(ScanOutcome::NoData);
        };

        let Some(event) = detect_bos(&htf, &s.bos) else {
            debug!(symbol, "no break of structure");
            return Ok(ScanOutcome::NoBreak);
        };
        let Some(atr_value) = atr(&htf, s.atr_period) else {
            return Ok(ScanOutcome::NoAtr);
        };
        let levels = match compute_levels(&event, &htf, atr_value, &s.levels) {
            Ok(levels) => levels,
            Err(AnalysisError::NumericDegeneracy(reason)) => {
                warn!(symbol, bos_ts = %event.break_time, reason = %reason, "degenerate levels, skipped");
                return Ok(ScanOutcome::Degenerate);
            }
            Err(e) => return Err(e.into()),
        };
        let pulled_back = is_pulled_back(&ltf, &levels);

        let candidate = Signal::detected(
            symbol,
            &event,
            &levels,
            atr_value,
            pulled_back,
            self.clock.now(),
        );
        let inserted = self.signals.insert(&candidate).await?;
        let bos_ts = candidate.bos_time;
        let stored = self.signals.get(symbol, bos_ts).await?.ok_or_else(|| {
            StoreError::NotFound(format!("{}@{} vanished after insert", symbol, bos_ts))
        })?;
        if inserted {
            info!(symbol, bos_ts = %bos_ts, direction = %candidate.direction, "new break of structure recorded");
        }

        let mut bos_sent = false;
        if !stored.notified_bos {
            let payload = AlertPayload::Bos(BosAlert {
                levels: AlertLevels::from_signal(&candidate, s.htf),
                status: BOS_STATUS.to_string(),
            });
            let accepted = self.dispatcher.dispatch(&payload).await;
            if !accepted.is_empty() {
                self.signals.mark_bos_sent(symbol, bos_ts).await?;
                self.mark_channels(symbol, &candidate, &accepted).await?;
                bos_sent = true;
            }
        }

        let mut market_sent = false;
        if pulled_back {
            self.signals
                .update_pulled_back(symbol, bos_ts, true)
                .await?;
            if stored.notified_market {
                debug!(symbol, bos_ts = %bos_ts, "market alert already delivered");
            } else if candidate.rr_tp2 < s.min_rr_alert {
                debug!(symbol, rr = candidate.rr_tp2, min = s.min_rr_alert, "market alert filtered by reward:risk");
            } else {
                let payload = AlertPayload::Market(MarketAlert {
                    levels: AlertLevels::from_signal(&candidate, s.ltf),
                    reward_risk: candidate.rr_tp2,
                    reasons: market_reasons(candidate.direction),
                    status: MARKET_STATUS.to_string(),
                });
                let accepted = self.dispatcher.dispatch(&payload).await;
                if !accepted.is_empty() {
                    self.signals.mark_market_sent(symbol, bos_ts).await?;
                    self.mark_channels(symbol, &candidate, &accepted).await?;
                    market_sent = true;
                }
            }
        }

        Ok(ScanOutcome::Processed {
            inserted,
            pulled_back,
            bos_sent,
            market_sent,
        })
    }

    /// # Summary
    /// 扫描所有启用的标的一轮，全部完成后才返回。
    ///
    /// # Logic
    /// 1. 读取启用的标的池。
    /// 2. 每个标的一个任务，任务内先获取并发许可再运行流水线。
    /// 3. 汇总结果；失败的标的计入 `failed` 并记录日志。
    /// 4. 达到心跳周期时发送状态报告。
    pub async fn run_cycle(self: &Arc<Self>) -> Result<CycleReport, ScanError> {
        let started = Instant::now();
        let universe = self.symbols.list_symbols(true).await?;
        let mut report = CycleReport {
            symbols: universe.len(),
            ..CycleReport::default()
        };

        let mut tasks = JoinSet::new();
        for symbol in universe {
            let this = Arc::clone(self);
            tasks.spawn(async move {
                let result = this.scan_with_permit(&symbol).await;
                (symbol, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => report.record(outcome),
                Ok((symbol, Err(e))) => {
                    warn!(symbol = %symbol, error = %e, "symbol scan failed");
                    report.failed += 1;
                }
                Err(e) => {
                    error!(error = %e, "symbol scan task aborted");
                    report.failed += 1;
                }
            }
        }

        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let every = self.settings.heartbeat_every;
        if every > 0 && cycle % every == 0 {
            if let Err(e) = self.send_status(report.symbols).await {
                warn!(error = %e, "heartbeat failed");
            }
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// # Summary
    /// 周期循环：扫描一轮，休眠固定间隔，直到收到关闭信号。
    ///
    /// # Arguments
    /// * `shutdown` - 值变为 true 或发送端被丢弃时退出；只在两轮之间及休眠期间检查。
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.settings.scan_interval.as_secs(),
            htf = %self.settings.htf,
            ltf = %self.settings.ltf,
            "scanner loop started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.run_cycle().await {
                Ok(report) => info!(
                    symbols = report.symbols,
                    processed = report.processed,
                    failed = report.failed,
                    bos_alerts = report.bos_alerts,
                    market_alerts = report.market_alerts,
                    elapsed_ms = report.elapsed.as_millis(),
                    "scan cycle finished"
                ),
                Err(e) => error!(error = %e, "scan cycle failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.scan_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("scanner loop stopped");
    }

    /// # Summary
    /// 临时触发单个标的的流水线，立即返回任务句柄。
    ///
    /// # Logic
    /// 与周期扫描共用并发许可；结果只写日志，调用方可选择等待句柄。
    pub fn trigger(self: &Arc<Self>, symbol: String) -> JoinHandle<Result<ScanOutcome, ScanError>> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.scan_with_permit(&symbol).await;
            match &result {
                Ok(outcome) => info!(symbol = %symbol, ?outcome, "triggered scan finished"),
                Err(e) => warn!(symbol = %symbol, error = %e, "triggered scan failed"),
            }
            result
        })
    }

    /// # Summary
    /// 发送一次状态报告。
    ///
    /// # Returns
    /// 确认接收的渠道列表。
    pub async fn send_status(&self, universe_size: usize) -> Result<Vec<NotifyChannel>, ScanError> {
        let stats = self.signals.stats().await?;
        let payload = AlertPayload::Status(StatusReport {
            at: self.clock.now(),
            universe_size,
            stats,
        });
        Ok(self.dispatcher.dispatch(&payload).await)
    }

    async fn scan_with_permit(&self, symbol: &str) -> Result<ScanOutcome, ScanError> {
        let _permit = Arc::clone(&self.limiter)
            .acquire_owned()
            .await
            .map_err(|_| ScanError::LimiterClosed)?;
        self.scan_symbol(symbol).await
    }

    /// 取数；`NotFound` 与空序列统一视为缺失
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Option<Vec<Candle>>, ScanError> {
        match self.provider.fetch_candles(symbol, timeframe, count).await {
            Ok(candles) if candles.is_empty() => {
                debug!(symbol, timeframe = %timeframe, "no candles");
                Ok(None)
            }
            Ok(candles) => Ok(Some(candles)),
            Err(MarketError::NotFound) => {
                debug!(symbol, timeframe = %timeframe, "series not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn mark_channels(
        &self,
        symbol: &str,
        signal: &Signal,
        channels: &[NotifyChannel],
    ) -> Result<(), ScanError> {
        for channel in channels {
            self.signals
                .mark_notified_channel(symbol, signal.bos_time, *channel)
                .await?;
        }
        Ok(())
    }
}

fn market_reasons(direction: Direction) -> Vec<String> {
    let (title, bias) = match direction {
        Direction::Long => ("Bullish", "bullish"),
        Direction::Short => ("Bearish", "bearish"),
    };
    vec![
        format!("{} BOS confirmed", title),
        "Pullback into LTF entry zone (FVG / structure)".to_string(),
        format!("HTF {} bias", bias),
    ]
}
