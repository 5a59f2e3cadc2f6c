use kizashi_core::market::entity::Candle;
use kizashi_core::signal::entity::LevelSet;

/// K 线区间 [low, high] 与 [zone_low, zone_high] 是否相交 (含边界)
pub fn in_zone(candle: &Candle, zone_low: f64, zone_high: f64) -> bool {
    candle.low <= zone_high && candle.high >= zone_low
}

/// # Summary
/// 判断低周期最后一根 K 线是否回踩进入入场区间。
///
/// # Returns
/// 序列为空时返回 false。
pub fn is_pulled_back(ltf: &[Candle], levels: &LevelSet) -> bool {
    ltf.last()
        .is_some_and(|c| in_zone(c, levels.zone_low, levels.zone_high))
}
