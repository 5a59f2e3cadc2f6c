use crate::swing::find_swings;
use kizashi_core::market::entity::Candle;
use kizashi_core::signal::entity::{BosEvent, Direction};

/// # Summary
/// 结构突破检测参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BosParams {
    pub left: usize,
    pub right: usize,
    // 只在最近 lookback 根 K 线内寻找突破收盘
    pub lookback: usize,
}

impl Default for BosParams {
    fn default() -> Self {
        Self {
            left: 3,
            right: 3,
            lookback: 5,
        }
    }
}

/// # Summary
/// 在高周期序列上检测收盘价突破最近摆动点的结构突破。
///
/// # Logic
/// 1. 序列长度不足 `left + right + lookback` 时直接返回 None。
/// 2. 多头优先：取最近的摆动高点 h，从 `max(h+1, n-lookback)` 起寻找第一根
///    收盘价严格高于 `High[h]` 的 K 线。
/// 3. 多头不成立时，对最近的摆动低点做对称的空头检查。
/// 4. `break_time` 取第一根突破收盘的时间，确认收盘/开盘取最后一根 K 线。
///
/// # Arguments
/// * `candles` - 按时间升序的高周期 K 线。
/// * `params` - 窗口半径与回看根数。
///
/// # Returns
/// 检测到突破返回 `Some(BosEvent)`，否则返回 None。
pub fn detect_bos(candles: &[Candle], params: &BosParams) -> Option<BosEvent> {
    let n = candles.len();
    if n < params.left + params.right + params.lookback {
        return None;
    }
    let last = candles.last()?;
    let (highs, lows) = find_swings(candles, params.left, params.right);
    let scan_from = |swing: usize| (swing + 1).max(n.saturating_sub(params.lookback));

    if let Some(&h) = highs.last() {
        let level = candles[h].high;
        if let Some(bar) = candles[scan_from(h)..].iter().find(|c| c.close > level) {
            return Some(BosEvent {
                direction: Direction::Long,
                broken_level: level,
                break_time: bar.time,
                confirming_close: last.close,
                confirming_open: last.open,
            });
        }
    }

    if let Some(&l) = lows.last() {
        let level = candles[l].low;
        if let Some(bar) = candles[scan_from(l)..].iter().find(|c| c.close < level) {
            return Some(BosEvent {
                direction: Direction::Short,
                broken_level: level,
                break_time: bar.time,
                confirming_close: last.close,
                confirming_open: last.open,
            });
        }
    }

    None
}
