use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// # Summary
/// 结构突破的方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// 向上突破 (做多思路)
    Long,
    /// 向下突破 (做空思路)
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            _ => Err(format!("Unknown Direction: {}", s)),
        }
    }
}

/// 摆动点种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

/// # Summary
/// 对称窗口内的局部极值点。
///
/// # Invariants
/// - `index` 指向原始 K 线序列。
/// - `price` 为该根 K 线的 high (SwingKind::High) 或 low (SwingKind::Low)。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub price: f64,
    pub kind: SwingKind,
}

/// # Summary
/// 一次结构突破 (BOS) 事件。每次检测都重新生成，不直接持久化。
///
/// # Invariants
/// - `break_time` 是第一根收盘越过 `broken_level` 的 K 线时间，作为信号身份的一部分。
/// - `confirming_close` / `confirming_open` 取自序列最后一根 K 线。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BosEvent {
    // 突破方向
    pub direction: Direction,
    // 被突破的摆动点价格
    pub broken_level: f64,
    // 首次收盘突破的 K 线时间
    pub break_time: DateTime<Utc>,
    // 最后一根 K 线收盘价
    pub confirming_close: f64,
    // 最后一根 K 线开盘价
    pub confirming_open: f64,
}

/// # Summary
/// 由突破事件与 ATR 推导出的入场区间、止损与止盈。
///
/// # Invariants
/// - `risk > 0`。
/// - Long: `stop < entry < tp1 < tp2 < tp3`；Short 反之。
/// - `zone_low <= zone_high`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    pub direction: Direction,
    pub zone_low: f64,
    pub zone_high: f64,
    pub entry: f64,
    pub stop: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub tp3: f64,
    pub risk: f64,
    // TP2 处的盈亏比
    pub rr_tp2: f64,
}

/// # Summary
/// 通知渠道，每个渠道对应信号上的一个独立送达标记。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyChannel {
    Telegram,
    WhatsApp,
}

impl NotifyChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyChannel::Telegram => "telegram",
            NotifyChannel::WhatsApp => "whatsapp",
        }
    }
}

impl std::fmt::Display for NotifyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Summary
/// 信号生命周期阶段，由标记位推导，不单独存储。
///
/// # Invariants
/// - `MarketAnnounced` 蕴含 `pulled_back == true`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignalStage {
    Detected,
    BosAnnounced,
    PulledBack,
    MarketAnnounced,
}

/// # Summary
/// 持久化的信号聚合根，记录一个交易想法从突破到回踩的完整生命周期。
///
/// # Invariants
/// - 身份为 `(symbol, bos_time)`，全局唯一。
/// - 创建后只有标记位与 `pulled_back` 会变化，且都是单向 false → true。
/// - 不会被删除，作为审计记录长期保留。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub bos_time: DateTime<Utc>,
    pub direction: Direction,
    pub entry: f64,
    pub zone_low: f64,
    pub zone_high: f64,
    pub stop: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub tp3: f64,
    pub atr: f64,
    pub rr_tp2: f64,
    pub pulled_back: bool,
    pub notified_bos: bool,
    pub notified_market: bool,
    pub notified_telegram: bool,
    pub notified_whatsapp: bool,
    pub created_at: DateTime<Utc>,
}

impl Signal {
    /// # Summary
    /// 根据一次检测结果构造尚未通知的新信号。
    ///
    /// # Arguments
    /// * `symbol` - 标的代码。
    /// * `event` - 突破事件，提供身份时间戳。
    /// * `levels` - 推导出的价位。
    /// * `atr` - 计算止损时使用的 ATR。
    /// * `pulled_back` - 本轮是否已回踩入场区间。
    /// * `created_at` - 记录创建时间。
    pub fn detected(
        symbol: &str,
        event: &BosEvent,
        levels: &LevelSet,
        atr: f64,
        pulled_back: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            bos_time: event.break_time,
            direction: levels.direction,
            entry: levels.entry,
            zone_low: levels.zone_low,
            zone_high: levels.zone_high,
            stop: levels.stop,
            tp1: levels.tp1,
            tp2: levels.tp2,
            tp3: levels.tp3,
            atr,
            rr_tp2: levels.rr_tp2,
            pulled_back,
            notified_bos: false,
            notified_market: false,
            notified_telegram: false,
            notified_whatsapp: false,
            created_at,
        }
    }

    /// 当前所处的最远阶段
    pub fn stage(&self) -> SignalStage {
        if self.notified_market {
            SignalStage::MarketAnnounced
        } else if self.pulled_back {
            SignalStage::PulledBack
        } else if self.notified_bos {
            SignalStage::BosAnnounced
        } else {
            SignalStage::Detected
        }
    }

    /// 指定渠道是否已送达过
    pub fn notified_on(&self, channel: NotifyChannel) -> bool {
        match channel {
            NotifyChannel::Telegram => self.notified_telegram,
            NotifyChannel::WhatsApp => self.notified_whatsapp,
        }
    }
}

/// # Summary
/// 扫描标的池中的一项。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub symbol: String,
    // 来源: config / file / webhook
    pub source: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// # Summary
/// 心跳报告使用的信号统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_signals: u64,
    pub market_sent: u64,
    pub pulled_back: u64,
    pub enabled_symbols: u64,
}
