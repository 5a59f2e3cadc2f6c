//! Average True Range.
//!
//! TR[0] = high - low；之后 TR[t] = max(high-low, |high-prev_close|, |low-prev_close|)。
//! ATR 为 TR 的简单滚动均值，窗口不足 `period` 时按已有根数求均值。

use crate::len_as_f64;
use kizashi_core::market::entity::Candle;

/// 逐根计算 True Range
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut prev_close: Option<f64> = None;
    candles
        .iter()
        .map(|c| {
            let range = c.high - c.low;
            let tr = match prev_close {
                Some(pc) => range.max((c.high - pc).abs()).max((c.low - pc).abs()),
                None => range,
            };
            prev_close = Some(c.close);
            tr
        })
        .collect()
}

/// # Summary
/// 计算整条 ATR 序列，长度与输入一致。
///
/// # Returns
/// `period == 0` 时返回空序列。
pub fn atr_series(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 {
        return Vec::new();
    }
    let tr = true_range(candles);
    (0..tr.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(period);
            let window = &tr[start..=i];
            match len_as_f64(window.len()) {
                Some(len) => window.iter().sum::<f64>() / len,
                None => f64::NAN,
            }
        })
        .collect()
}

/// 最后一根 K 线的 ATR；序列为空或结果非有限值时返回 None
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    atr_series(candles, period)
        .last()
        .copied()
        .filter(|v| v.is_finite())
}
