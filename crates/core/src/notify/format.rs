//! 提醒消息的文本契约。
//!
//! 价格统一保留 5 位小数，与外汇报价精度对齐。

use super::entity::{AlertLevels, AlertPayload, BosAlert, MarketAlert, StatusReport};
use crate::signal::entity::Direction;

impl AlertPayload {
    /// 渲染为最终发送的纯文本
    pub fn render(&self) -> String {
        match self {
            AlertPayload::Bos(alert) => render_bos(alert),
            AlertPayload::Market(alert) => render_market(alert),
            AlertPayload::Status(report) => render_status(report),
        }
    }
}

fn render_bos(alert: &BosAlert) -> String {
    let l = &alert.levels;
    // 多头止损在入场下方，空头在上方
    let stop_side = match l.direction {
        Direction::Long => "Below",
        Direction::Short => "Above",
    };
    [
        "🟡 BOS CONFIRMED – TRADE IDEA\n".to_string(),
        format!("Market: {}", l.symbol),
        format!("Direction: {}", l.direction.as_str().to_uppercase()),
        format!("BOS TF: {} (body close)\n", l.timeframe),
        "Potential Entry Area:".to_string(),
        format!("• {} (FVG / Structure)\n", zone(l)),
        "Projected SL:".to_string(),
        format!("• {} {:.5}\n", stop_side, l.stop),
        "Projected TP:".to_string(),
        format!("• {:.5}", l.tp1),
        format!("• {:.5}\n", l.tp2),
        format!("Status: {}", alert.status),
    ]
    .join("\n")
}

fn render_market(alert: &MarketAlert) -> String {
    let l = &alert.levels;
    let mut lines = vec![
        "📊 MARKET SCAN ALERT\n".to_string(),
        format!("Instrument: {}", l.symbol),
        format!("Direction: {}", l.direction.as_str().to_uppercase()),
        format!("Timeframe: {}\n", l.timeframe),
        format!("📌 Entry Zone: {}", zone(l)),
        format!("🛑 Stop Loss: {:.5}", l.stop),
        format!("🎯 TP1: {:.5}", l.tp1),
        format!("🎯 TP2: {:.5}", l.tp2),
        format!("R:R ≈ 1:{:.1}\n", alert.reward_risk),
        "Reason:".to_string(),
    ];
    lines.extend(alert.reasons.iter().map(|r| format!("• {}", r)));
    lines.push(format!("\nStatus: {}", alert.status));
    lines.join("\n")
}

fn render_status(report: &StatusReport) -> String {
    [
        "🔎 Scanner status update".to_string(),
        format!("Time: {}", report.at.format("%Y-%m-%d %H:%M:%S UTC")),
        format!("Universe size: {} instruments", report.universe_size),
        format!("Signals stored: {}", report.stats.total_signals),
        format!("Pulled back: {}", report.stats.pulled_back),
        format!("Market alerts sent: {}", report.stats.market_sent),
    ]
    .join("\n")
}

fn zone(l: &AlertLevels) -> String {
    format!("{:.5} – {:.5}", l.zone_low, l.zone_high)
}
