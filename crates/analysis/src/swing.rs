use kizashi_core::market::entity::Candle;
use kizashi_core::signal::entity::{SwingKind, SwingPoint};

/// # Summary
/// 在对称窗口内寻找摆动高点与摆动低点。
///
/// # Logic
/// 1. 仅检查 `left <= i < n - right` 的下标。
/// 2. `high[i]` 必须是窗口 `[i-left, i+right]` 内严格唯一的最大值才算摆动高点；
///    窗口内出现相同的最高价时该下标被排除。低点规则对称。
///
/// # Arguments
/// * `candles` - 按时间升序的 K 线序列。
/// * `left` - 左侧窗口半径。
/// * `right` - 右侧窗口半径。
///
/// # Returns
/// `(swing_highs, swing_lows)`，均为升序下标列表。
/// 序列长度小于 `left + right + 1` 时两者均为空。
pub fn find_swings(candles: &[Candle], left: usize, right: usize) -> (Vec<usize>, Vec<usize>) {
    let n = candles.len();
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    if n < left + right + 1 {
        return (highs, lows);
    }

    for i in left..n - right {
        let window = &candles[i - left..=i + right];
        let pivot = &candles[i];

        let unique_high = window
            .iter()
            .enumerate()
            .all(|(j, c)| j == left || c.high < pivot.high);
        if unique_high {
            highs.push(i);
        }

        let unique_low = window
            .iter()
            .enumerate()
            .all(|(j, c)| j == left || c.low > pivot.low);
        if unique_low {
            lows.push(i);
        }
    }

    (highs, lows)
}

/// 以 `SwingPoint` 形式返回摆动点，按下标合并排序
pub fn swing_points(candles: &[Candle], left: usize, right: usize) -> Vec<SwingPoint> {
    let (highs, lows) = find_swings(candles, left, right);
    let mut points: Vec<SwingPoint> = highs
        .into_iter()
        .map(|index| SwingPoint {
            index,
            price: candles[index].high,
            kind: SwingKind::High,
        })
        .chain(lows.into_iter().map(|index| SwingPoint {
            index,
            price: candles[index].low,
            kind: SwingKind::Low,
        }))
        .collect();
    points.sort_by_key(|p| p.index);
    points
}
