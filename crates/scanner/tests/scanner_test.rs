use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use kizashi_core::common::TimeFrame;
use kizashi_core::common::time::FakeClockProvider;
use kizashi_core::market::entity::Candle;
use kizashi_core::notify::port::Notifier;
use kizashi_core::signal::entity::{Direction, NotifyChannel, SignalStage};
use kizashi_core::store::port::{SignalStore, SymbolStore};
use kizashi_core::test_utils::{MockProvider, RecordingNotifier};
use kizashi_scanner::{NotificationDispatcher, ScanError, ScanOrchestrator, ScanOutcome, ScanSettings};
use kizashi_store::memory::MemorySignalStore;
use std::sync::Arc;
use tokio::sync::{Semaphore, watch};

fn htf_time(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap() + Duration::hours(4 * i)
}

fn bar(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        time,
        open,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

/// 摆动高点 100，第 9 根首次收盘突破，最后收盘 105；入场区间约 [101.07, 103.09]
fn bullish_htf() -> Vec<Candle> {
    let rows = [
        (94.0, 95.0, 93.0, 94.5),
        (94.5, 96.0, 94.0, 95.5),
        (95.5, 97.0, 95.0, 96.5),
        (96.5, 98.0, 96.0, 97.5),
        (97.5, 99.0, 97.0, 98.5),
        (98.5, 100.0, 98.0, 99.5),
        (99.0, 99.0, 97.0, 98.5),
        (98.0, 98.0, 96.0, 97.5),
        (97.0, 97.0, 95.0, 96.5),
        (99.5, 102.0, 99.0, 101.0),
        (101.0, 104.0, 101.0, 103.0),
        (103.0, 106.0, 103.0, 105.0),
    ];
    rows.iter()
        .zip(0..)
        .map(|(&(o, h, l, c), i)| bar(htf_time(i), o, h, l, c))
        .collect()
}

/// 低周期序列，最后一根 K 线的 [low, high] 决定是否回踩
fn ltf(last_low: f64, last_high: f64) -> Vec<Candle> {
    let start = htf_time(11);
    let mut candles: Vec<Candle> = (0..5)
        .map(|i| bar(start + Duration::minutes(15 * i), 105.0, 106.0, 104.5, 105.5))
        .collect();
    candles.push(bar(
        start + Duration::minutes(75),
        last_high,
        last_high,
        last_low,
        last_low,
    ));
    candles
}

fn ltf_away() -> Vec<Candle> {
    ltf(104.5, 106.0)
}

fn ltf_in_zone() -> Vec<Candle> {
    ltf(102.0, 104.0)
}

struct Harness {
    provider: Arc<MockProvider>,
    store: Arc<MemorySignalStore>,
    telegram: Arc<RecordingNotifier>,
    whatsapp: Arc<RecordingNotifier>,
    limiter: Arc<Semaphore>,
    orchestrator: Arc<ScanOrchestrator>,
}

impl Harness {
    fn new(settings: ScanSettings) -> Self {
        Self::with_permits(settings, 2)
    }

    fn with_permits(settings: ScanSettings, permits: usize) -> Self {
        let telegram = Arc::new(RecordingNotifier::new(NotifyChannel::Telegram));
        let whatsapp = Arc::new(RecordingNotifier::new(NotifyChannel::WhatsApp));
        let notifiers: Vec<Arc<dyn Notifier>> = vec![telegram.clone(), whatsapp.clone()];
        Self::with_notifiers(settings, notifiers, telegram, whatsapp, permits)
    }

    fn with_notifiers(
        settings: ScanSettings,
        notifiers: Vec<Arc<dyn Notifier>>,
        telegram: Arc<RecordingNotifier>,
        whatsapp: Arc<RecordingNotifier>,
        permits: usize,
    ) -> Self {
        let provider = Arc::new(MockProvider::new());
        let store = Arc::new(MemorySignalStore::new());
        let limiter = Arc::new(Semaphore::new(permits));
        let clock = Arc::new(FakeClockProvider::new(htf_time(12)));
        let orchestrator = ScanOrchestrator::new(
            provider.clone(),
            store.clone(),
            store.clone(),
            Arc::new(NotificationDispatcher::new(notifiers)),
            limiter.clone(),
            clock,
            settings,
        );
        Self {
            provider,
            store,
            telegram,
            whatsapp,
            limiter,
            orchestrator,
        }
    }

    fn script(&self, symbol: &str, ltf: Vec<Candle>) {
        self.provider.set_series(symbol, TimeFrame::Hour4, bullish_htf());
        self.provider.set_series(symbol, TimeFrame::Minute15, ltf);
    }
}

/// # Summary
/// 数据不变的两次扫描只产生一次 BOS 提醒。
#[tokio::test]
async fn test_single_bos_alert_across_repeated_scans() -> Result<()> {
    let h = Harness::new(ScanSettings::default());
    h.script("EURUSD=X", ltf_away());

    let first = h.orchestrator.scan_symbol("EURUSD=X").await?;
    assert_eq!(
        first,
        ScanOutcome::Processed {
            inserted: true,
            pulled_back: false,
            bos_sent: true,
            market_sent: false,
        }
    );
    let second = h.orchestrator.scan_symbol("EURUSD=X").await?;
    assert_eq!(
        second,
        ScanOutcome::Processed {
            inserted: false,
            pulled_back: false,
            bos_sent: false,
            market_sent: false,
        }
    );

    let sent = h.telegram.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("BOS CONFIRMED"));
    assert!(sent[0].contains("Status: Waiting for pullback"));
    assert_eq!(h.whatsapp.sent().await.len(), 1);

    let stored = h.store.get("EURUSD=X", htf_time(9)).await?.unwrap();
    assert_eq!(stored.direction, Direction::Long);
    assert_eq!(stored.stage(), SignalStage::BosAnnounced);
    assert!(stored.notified_telegram && stored.notified_whatsapp);
    assert_eq!(stored.created_at, htf_time(12));
    Ok(())
}

/// # Summary
/// 发送失败时标记保持 false，下一次扫描重试。
#[tokio::test]
async fn test_transport_failure_is_retried_next_scan() -> Result<()> {
    let h = Harness::new(ScanSettings::default());
    h.script("GBPUSD=X", ltf_away());
    h.telegram.set_failing(true);
    h.whatsapp.set_failing(true);

    let outcome = h.orchestrator.scan_symbol("GBPUSD=X").await?;
    assert!(matches!(outcome, ScanOutcome::Processed { bos_sent: false, .. }));
    let stored = h.store.get("GBPUSD=X", htf_time(9)).await?.unwrap();
    assert!(!stored.notified_bos);

    h.telegram.set_failing(false);
    h.whatsapp.set_failing(false);
    let outcome = h.orchestrator.scan_symbol("GBPUSD=X").await?;
    assert!(matches!(outcome, ScanOutcome::Processed { bos_sent: true, .. }));
    assert!(h.store.get("GBPUSD=X", htf_time(9)).await?.unwrap().notified_bos);
    assert_eq!(h.telegram.sent().await.len(), 1);
    Ok(())
}

/// # Summary
/// 只有接收成功的渠道会被标记。
#[tokio::test]
async fn test_partial_delivery_marks_accepting_channel_only() -> Result<()> {
    let h = Harness::new(ScanSettings::default());
    h.script("AAPL", ltf_away());
    h.telegram.set_failing(true);

    h.orchestrator.scan_symbol("AAPL").await?;
    let stored = h.store.get("AAPL", htf_time(9)).await?.unwrap();
    assert!(stored.notified_bos);
    assert!(stored.notified_whatsapp);
    assert!(!stored.notified_telegram);
    Ok(())
}

/// # Summary
/// 回踩提醒只发送一次，`pulled_back` 之后不会被重置。
#[tokio::test]
async fn test_pullback_alert_once_and_flag_never_resets() -> Result<()> {
    let h = Harness::new(ScanSettings::default());
    h.script("SPY", ltf_away());
    h.orchestrator.scan_symbol("SPY").await?;

    h.provider
        .set_series("SPY", TimeFrame::Minute15, ltf_in_zone());
    let outcome = h.orchestrator.scan_symbol("SPY").await?;
    assert_eq!(
        outcome,
        ScanOutcome::Processed {
            inserted: false,
            pulled_back: true,
            bos_sent: false,
            market_sent: true,
        }
    );
    // 仍在区间内，不再重复发送
    let outcome = h.orchestrator.scan_symbol("SPY").await?;
    assert!(matches!(outcome, ScanOutcome::Processed { market_sent: false, .. }));

    h.provider.set_series("SPY", TimeFrame::Minute15, ltf_away());
    h.orchestrator.scan_symbol("SPY").await?;

    let stored = h.store.get("SPY", htf_time(9)).await?.unwrap();
    assert!(stored.pulled_back);
    assert_eq!(stored.stage(), SignalStage::MarketAnnounced);

    let sent = h.telegram.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(sent[1].contains("MARKET SCAN ALERT"));
    assert!(sent[1].contains("Timeframe: 15m"));
    assert!(sent[1].contains("Bullish BOS confirmed"));
    assert!(sent[1].contains("HTF bullish bias"));
    assert!(sent[1].contains("Status: Waiting for entry"));
    Ok(())
}

/// # Summary
/// 首次检测即已回踩时，同一次扫描先发 BOS 提醒再发回踩提醒。
#[tokio::test]
async fn test_first_scan_already_pulled_back_sends_both_alerts() -> Result<()> {
    let h = Harness::new(ScanSettings::default());
    h.script("EURUSD=X", ltf_in_zone());

    let outcome = h.orchestrator.scan_symbol("EURUSD=X").await?;
    assert_eq!(
        outcome,
        ScanOutcome::Processed {
            inserted: true,
            pulled_back: true,
            bos_sent: true,
            market_sent: true,
        }
    );
    let sent = h.telegram.sent().await;
    assert!(sent[0].contains("BOS CONFIRMED"));
    assert!(sent[1].contains("MARKET SCAN ALERT"));
    Ok(())
}

/// # Summary
/// 盈亏比低于阈值时不发回踩提醒，但信号与回踩状态照常记录。
#[tokio::test]
async fn test_reward_risk_filter_suppresses_market_alert() -> Result<()> {
    let settings = ScanSettings {
        min_rr_alert: 2.5,
        ..ScanSettings::default()
    };
    let h = Harness::new(settings);
    h.script("SPY", ltf_in_zone());

    let outcome = h.orchestrator.scan_symbol("SPY").await?;
    assert_eq!(
        outcome,
        ScanOutcome::Processed {
            inserted: true,
            pulled_back: true,
            bos_sent: true,
            market_sent: false,
        }
    );
    let stored = h.store.get("SPY", htf_time(9)).await?.unwrap();
    assert!(stored.pulled_back);
    assert!(!stored.notified_market);
    assert_eq!(h.telegram.sent().await.len(), 1);
    Ok(())
}

/// # Summary
/// 数据缺失与无突破都不写库、不通知。
#[tokio::test]
async fn test_missing_data_and_no_break_skip_symbol() -> Result<()> {
    let h = Harness::new(ScanSettings::default());
    assert_eq!(h.orchestrator.scan_symbol("QQQ").await?, ScanOutcome::NoData);

    // 只有高周期数据
    h.provider
        .set_series("XAUUSD", TimeFrame::Hour4, bullish_htf());
    assert_eq!(h.orchestrator.scan_symbol("XAUUSD").await?, ScanOutcome::NoData);

    // 单调上涨没有摆动高点
    let flat: Vec<Candle> = (0..20)
        .map(|i| {
            let p = 100.0 + f64::from(u32::try_from(i).unwrap());
            bar(htf_time(i), p, p + 0.5, p - 0.5, p + 0.2)
        })
        .collect();
    h.provider.set_series("MSFT", TimeFrame::Hour4, flat);
    h.provider
        .set_series("MSFT", TimeFrame::Minute15, ltf_away());
    assert_eq!(h.orchestrator.scan_symbol("MSFT").await?, ScanOutcome::NoBreak);

    assert_eq!(h.store.stats().await?.total_signals, 0);
    assert!(h.telegram.sent().await.is_empty());
    Ok(())
}

/// # Summary
/// 行情源报错时返回 `ScanError::Market`。
#[tokio::test]
async fn test_provider_failure_surfaces_as_error() {
    let h = Harness::new(ScanSettings::default());
    h.script("EURUSD=X", ltf_away());
    h.provider.fail_symbol("EURUSD=X");
    let result = h.orchestrator.scan_symbol("EURUSD=X").await;
    assert!(matches!(result, Err(ScanError::Market(_))));
}

/// # Summary
/// 一轮扫描中某个标的失败不影响其它标的的提醒。
#[tokio::test]
async fn test_cycle_isolates_failing_symbol() -> Result<()> {
    let h = Harness::new(ScanSettings::default());
    for symbol in ["AAPL", "BROKEN", "EURUSD=X"] {
        h.store.add_symbol(symbol, "config").await?;
        h.script(symbol, ltf_away());
    }
    h.store.add_symbol("DISABLED", "config").await?;
    h.script("DISABLED", ltf_away());
    h.store.set_enabled("DISABLED", false).await?;
    h.provider.fail_symbol("BROKEN");

    let report = h.orchestrator.run_cycle().await?;
    assert_eq!(report.symbols, 3);
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.bos_alerts, 2);
    assert_eq!(report.market_alerts, 0);

    assert!(h.store.get("AAPL", htf_time(9)).await?.is_some());
    assert!(h.store.get("EURUSD=X", htf_time(9)).await?.is_some());
    assert!(h.store.get("DISABLED", htf_time(9)).await?.is_none());
    assert_eq!(h.telegram.sent().await.len(), 2);
    Ok(())
}

/// # Summary
/// 一轮扫描中同时运行的流水线不超过并发许可数。
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cycle_respects_concurrency_limit() -> Result<()> {
    let h = Harness::with_permits(ScanSettings::default(), 3);
    h.provider.set_delay(std::time::Duration::from_millis(30));
    for i in 0..12 {
        let symbol = format!("SYM{:02}", i);
        h.store.add_symbol(&symbol, "config").await?;
        h.script(&symbol, ltf_away());
    }

    let report = h.orchestrator.run_cycle().await?;
    assert_eq!(report.symbols, 12);
    assert_eq!(report.processed, 12);

    let peak = h.provider.peak_in_flight();
    assert!(peak <= 3, "peak in-flight fetches {} exceeds 3 permits", peak);
    assert!(peak >= 2, "pipelines never overlapped (peak {})", peak);
    assert_eq!(h.limiter.available_permits(), 3);
    Ok(())
}

/// # Summary
/// 心跳每 N 轮发送一次状态报告。
#[tokio::test]
async fn test_heartbeat_every_n_cycles() -> Result<()> {
    let settings = ScanSettings {
        heartbeat_every: 2,
        ..ScanSettings::default()
    };
    let h = Harness::new(settings);
    h.store.add_symbol("SPY", "config").await?;

    h.orchestrator.run_cycle().await?;
    assert!(h.telegram.sent().await.is_empty());
    h.orchestrator.run_cycle().await?;
    h.orchestrator.run_cycle().await?;

    let sent = h.telegram.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Scanner status update"));
    assert!(sent[0].contains("Universe size: 1"));
    Ok(())
}

/// # Summary
/// 没有配置任何渠道时只写日志，标记保持 false。
#[tokio::test]
async fn test_no_notifiers_leaves_flags_unset() -> Result<()> {
    let telegram = Arc::new(RecordingNotifier::new(NotifyChannel::Telegram));
    let whatsapp = Arc::new(RecordingNotifier::new(NotifyChannel::WhatsApp));
    let h = Harness::with_notifiers(ScanSettings::default(), Vec::new(), telegram, whatsapp, 2);
    h.script("SPY", ltf_in_zone());

    h.orchestrator.scan_symbol("SPY").await?;
    let stored = h.store.get("SPY", htf_time(9)).await?.unwrap();
    assert!(!stored.notified_bos);
    assert!(!stored.notified_market);
    assert!(stored.pulled_back);
    Ok(())
}

/// # Summary
/// 临时触发走同一流水线，并与周期扫描共用并发许可。
#[tokio::test]
async fn test_trigger_runs_pipeline_in_background() -> Result<()> {
    let h = Harness::new(ScanSettings::default());
    h.script("EURUSD=X", ltf_away());

    let outcome = h.orchestrator.trigger("EURUSD=X".to_string()).await??;
    assert!(matches!(outcome, ScanOutcome::Processed { inserted: true, .. }));
    assert_eq!(h.limiter.available_permits(), 2);

    h.limiter.close();
    let result = h.orchestrator.trigger("EURUSD=X".to_string()).await?;
    assert!(matches!(result, Err(ScanError::LimiterClosed)));
    Ok(())
}

/// # Summary
/// 周期循环在收到关闭信号后退出。
#[tokio::test]
async fn test_run_loop_stops_on_shutdown() -> Result<()> {
    let h = Harness::new(ScanSettings::default());
    h.store.add_symbol("EURUSD=X", "config").await?;
    h.script("EURUSD=X", ltf_away());

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(h.orchestrator.clone().run(rx));

    // 等待第一轮完成
    for _ in 0..100 {
        if !h.telegram.sent().await.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(h.telegram.sent().await.len(), 1);

    tx.send(true)?;
    tokio::time::timeout(std::time::Duration::from_secs(5), handle).await??;
    Ok(())
}
