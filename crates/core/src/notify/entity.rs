use crate::common::TimeFrame;
use crate::signal::entity::{Direction, Signal, StoreStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 两类交易提醒共有的价位字段。
///
/// # Invariants
/// - 所有字段均为必填，不存在 "缺字段时回退默认值" 的情况。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertLevels {
    pub symbol: String,
    pub direction: Direction,
    // 消息中展示的周期：BOS 提醒为 HTF，回踩提醒为 LTF
    pub timeframe: TimeFrame,
    pub zone_low: f64,
    pub zone_high: f64,
    pub stop: f64,
    pub tp1: f64,
    pub tp2: f64,
}

impl AlertLevels {
    /// 从信号的价位构造；传入的信号可以是本轮扫描的候选，不一定是存储中的记录
    pub fn from_signal(signal: &Signal, timeframe: TimeFrame) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            timeframe,
            zone_low: signal.zone_low,
            zone_high: signal.zone_high,
            stop: signal.stop,
            tp1: signal.tp1,
            tp2: signal.tp2,
        }
    }
}

/// BOS 确认提醒
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BosAlert {
    pub levels: AlertLevels,
    pub status: String,
}

/// 回踩入场区间 (Market Scan) 提醒
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAlert {
    pub levels: AlertLevels,
    // TP2 处的盈亏比，展示为 1:x
    pub reward_risk: f64,
    pub reasons: Vec<String>,
    pub status: String,
}

/// 周期性的扫描器状态报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub at: DateTime<Utc>,
    pub universe_size: usize,
    pub stats: StoreStats,
}

/// # Summary
/// 发往通知渠道的结构化载荷。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlertPayload {
    Bos(BosAlert),
    Market(MarketAlert),
    Status(StatusReport),
}

impl AlertPayload {
    /// 日志使用的短标签
    pub fn kind(&self) -> &'static str {
        match self {
            AlertPayload::Bos(_) => "bos",
            AlertPayload::Market(_) => "market",
            AlertPayload::Status(_) => "status",
        }
    }
}
