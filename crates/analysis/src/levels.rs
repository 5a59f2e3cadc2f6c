use crate::error::AnalysisError;
use kizashi_core::market::entity::Candle;
use kizashi_core::signal::entity::{BosEvent, Direction, LevelSet};

/// 风险下限，避免除零
const MIN_RISK: f64 = 1e-6;

/// # Summary
/// 入场区间与止损的参数。
///
/// # Invariants
/// - `0 < low_frac < high_frac`。
/// - `atr_buffer >= 0`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelParams {
    pub low_frac: f64,
    pub high_frac: f64,
    pub atr_buffer: f64,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            low_frac: 0.382,
            high_frac: 0.786,
            atr_buffer: 0.5,
        }
    }
}

impl LevelParams {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.low_frac > 0.0 && self.low_frac < self.high_frac && self.high_frac.is_finite()) {
            return Err(AnalysisError::InvalidParams(format!(
                "retracement fractions must satisfy 0 < low < high, got {} / {}",
                self.low_frac, self.high_frac
            )));
        }
        if !(self.atr_buffer >= 0.0 && self.atr_buffer.is_finite()) {
            return Err(AnalysisError::InvalidParams(format!(
                "atr buffer must be >= 0, got {}",
                self.atr_buffer
            )));
        }
        Ok(())
    }
}

/// # Summary
/// 根据突破事件与 ATR 推导入场区间、止损与三档止盈。
///
/// # Logic
/// 1. 冲击幅度 = |最后收盘 - 被突破价位|；恰好为 0 时，退化为最近一次非零的收盘涨跌幅绝对值。
/// 2. 以最后收盘为锚点按回撤比例划出区间，入场取区间靠近突破的一侧 (`zone_high`)。
/// 3. 止损 = 被突破价位 ∓ ATR × buffer。
/// 4. 风险 = |entry - stop|，下限 1e-6；TPk = entry ± risk × k。
///
/// # Arguments
/// * `event` - 突破事件。
/// * `candles` - 高周期序列，仅用于冲击幅度退化时的回退计算。
/// * `atr` - 最后一根 K 线的 ATR。
/// * `params` - 回撤比例与 ATR 缓冲。
///
/// # Returns
/// 成功返回 `LevelSet`；任一价位非有限值，或止损落在入场价错误一侧时返回
/// `AnalysisError::NumericDegeneracy`。
pub fn compute_levels(
    event: &BosEvent,
    candles: &[Candle],
    atr: f64,
    params: &LevelParams,
) -> Result<LevelSet, AnalysisError> {
    params.validate()?;
    if !(atr.is_finite() && atr >= 0.0) {
        return Err(AnalysisError::InvalidParams(format!(
            "atr must be finite and >= 0, got {}",
            atr
        )));
    }

    let last_close = event.confirming_close;
    let broken = event.broken_level;
    let mut impulse = (last_close - broken).abs();
    if impulse == 0.0 {
        impulse = fallback_impulse(candles).ok_or_else(|| {
            AnalysisError::NumericDegeneracy("zero impulse and flat close series".to_string())
        })?;
    }

    let (zone_low, zone_high, stop) = match event.direction {
        Direction::Long => (
            last_close - impulse * params.high_frac,
            last_close - impulse * params.low_frac,
            broken - atr * params.atr_buffer,
        ),
        Direction::Short => (
            last_close + impulse * params.low_frac,
            last_close + impulse * params.high_frac,
            broken + atr * params.atr_buffer,
        ),
    };
    let entry = zone_high;
    let risk = (entry - stop).abs().max(MIN_RISK);

    let step = match event.direction {
        Direction::Long => risk,
        Direction::Short => -risk,
    };
    let levels = LevelSet {
        direction: event.direction,
        zone_low,
        zone_high,
        entry,
        stop,
        tp1: entry + step,
        tp2: entry + step * 2.0,
        tp3: entry + step * 3.0,
        risk,
        rr_tp2: (step * 2.0).abs() / risk,
    };

    check_levels(&levels)?;
    Ok(levels)
}

/// 最近一次非零的收盘涨跌幅绝对值
fn fallback_impulse(candles: &[Candle]) -> Option<f64> {
    candles
        .windows(2)
        .rev()
        .filter(|w| w[0].close != 0.0)
        .map(|w| ((w[1].close - w[0].close) / w[0].close).abs())
        .find(|pct| pct.is_finite() && *pct > 0.0)
}

fn check_levels(levels: &LevelSet) -> Result<(), AnalysisError> {
    let values = [
        levels.zone_low,
        levels.zone_high,
        levels.entry,
        levels.stop,
        levels.tp1,
        levels.tp2,
        levels.tp3,
        levels.risk,
        levels.rr_tp2,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NumericDegeneracy(format!(
            "non-finite level in {:?}",
            levels
        )));
    }
    if levels.risk <= 0.0 {
        return Err(AnalysisError::NumericDegeneracy("risk is not positive".to_string()));
    }
    let wrong_side = match levels.direction {
        Direction::Long => levels.stop >= levels.entry,
        Direction::Short => levels.stop <= levels.entry,
    };
    if wrong_side {
        return Err(AnalysisError::NumericDegeneracy(format!(
            "stop {:.5} is on the wrong side of entry {:.5}",
            levels.stop, levels.entry
        )));
    }
    Ok(())
}
