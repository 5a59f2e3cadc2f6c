use chrono::{DateTime, Duration, TimeZone, Utc};
use kizashi_analysis::atr::{atr_series, true_range};
use kizashi_analysis::pullback::in_zone;
use kizashi_analysis::{
    AnalysisError, BosParams, LevelParams, atr, compute_levels, detect_bos, find_swings,
    is_pulled_back, swing_points,
};
use kizashi_core::market::entity::Candle;
use kizashi_core::signal::entity::{BosEvent, Direction, LevelSet, SwingKind};

fn t(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap() + Duration::hours(4 * i)
}

fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        time: t(i),
        open,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

fn from_lows(lows: &[f64]) -> Vec<Candle> {
    lows.iter()
        .enumerate()
        .map(|(i, l)| bar(i64::try_from(i).unwrap(), l + 0.2, l + 0.5, *l, l + 0.3))
        .collect()
}

fn from_highs(highs: &[f64]) -> Vec<Candle> {
    highs
        .iter()
        .enumerate()
        .map(|(i, h)| bar(i64::try_from(i).unwrap(), h - 0.2, *h, h - 0.5, h - 0.3))
        .collect()
}

/// 单个摆动高点 100，第 9 根收盘 101 首次突破，最后一根收盘 105
fn bullish_series() -> Vec<Candle> {
    vec![
        bar(0, 94.0, 95.0, 93.0, 94.5),
        bar(1, 94.5, 96.0, 94.0, 95.5),
        bar(2, 95.5, 97.0, 95.0, 96.5),
        bar(3, 96.5, 98.0, 96.0, 97.5),
        bar(4, 97.5, 99.0, 97.0, 98.5),
        bar(5, 98.5, 100.0, 98.0, 99.5),
        bar(6, 99.0, 99.0, 97.0, 98.5),
        bar(7, 98.0, 98.0, 96.0, 97.5),
        bar(8, 97.0, 97.0, 95.0, 96.5),
        bar(9, 99.5, 102.0, 99.0, 101.0),
        bar(10, 101.0, 104.0, 101.0, 103.0),
        bar(11, 103.0, 106.0, 103.0, 105.0),
    ]
}

/// 以 100 为轴做价格镜像，多头结构变为空头结构
fn mirror(candles: &[Candle]) -> Vec<Candle> {
    candles
        .iter()
        .map(|c| Candle {
            time: c.time,
            open: 200.0 - c.open,
            high: 200.0 - c.low,
            low: 200.0 - c.high,
            close: 200.0 - c.close,
            volume: c.volume,
        })
        .collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_swings_empty_for_short_series() {
    let candles = from_highs(&[1.0, 2.0, 3.0, 2.0, 1.0, 0.5]);
    let (highs, lows) = find_swings(&candles, 3, 3);
    assert!(highs.is_empty());
    assert!(lows.is_empty());
}

#[test]
fn test_swings_exclude_tied_extremum() {
    let unique = from_highs(&[1.0, 2.0, 5.0, 4.0, 2.0, 1.0, 0.0]);
    let (highs, _) = find_swings(&unique, 2, 2);
    assert_eq!(highs, vec![2]);

    let tied = from_highs(&[1.0, 2.0, 5.0, 5.0, 2.0, 1.0, 0.0]);
    let (highs, _) = find_swings(&tied, 2, 2);
    assert!(highs.is_empty());
}

#[test]
fn test_swings_exclude_tied_low() {
    let unique = from_lows(&[5.0, 4.0, 1.0, 2.0, 4.0, 5.0, 6.0]);
    let (_, lows) = find_swings(&unique, 2, 2);
    assert_eq!(lows, vec![2]);

    let tied = from_lows(&[5.0, 4.0, 1.0, 1.0, 4.0, 5.0, 6.0]);
    let (_, lows) = find_swings(&tied, 2, 2);
    assert!(lows.is_empty());
}

#[test]
fn test_swing_points_merged_in_index_order() {
    let candles = bullish_series();
    let points = swing_points(&candles, 3, 3);
    let indices: Vec<usize> = points.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![5, 8]);
    assert_eq!(points[0].kind, SwingKind::High);
    assert_close(points[0].price, 100.0);
    assert_eq!(points[1].kind, SwingKind::Low);
    assert_close(points[1].price, 95.0);
}

#[test]
fn test_detect_bullish_bos() {
    let candles = bullish_series();
    let event = detect_bos(&candles, &BosParams::default()).unwrap();
    assert_eq!(event.direction, Direction::Long);
    assert_close(event.broken_level, 100.0);
    assert_eq!(event.break_time, t(9));
    assert_close(event.confirming_close, 105.0);
    assert_close(event.confirming_open, 103.0);
}

#[test]
fn test_detect_bearish_bos_on_mirrored_series() {
    let candles = mirror(&bullish_series());
    let event = detect_bos(&candles, &BosParams::default()).unwrap();
    assert_eq!(event.direction, Direction::Short);
    assert_close(event.broken_level, 100.0);
    assert_eq!(event.break_time, t(9));
    assert_close(event.confirming_close, 95.0);
}

#[test]
fn test_detect_bos_is_idempotent() {
    let candles = bullish_series();
    let params = BosParams::default();
    assert_eq!(detect_bos(&candles, &params), detect_bos(&candles, &params));
}

#[test]
fn test_detect_bos_requires_history() {
    let candles = bullish_series();
    // 需要 3 + 3 + 5 = 11 根
    assert!(detect_bos(&candles[..10], &BosParams::default()).is_none());
}

#[test]
fn test_detect_bos_none_without_break() {
    let mut candles = bullish_series();
    candles.truncate(9);
    candles.extend([
        bar(9, 96.5, 99.5, 96.0, 99.0),
        bar(10, 99.0, 99.8, 98.0, 99.5),
        bar(11, 99.5, 99.9, 98.5, 99.0),
    ]);
    assert!(detect_bos(&candles, &BosParams::default()).is_none());
}

#[test]
fn test_bullish_check_takes_precedence() {
    // 摆动高点 100 (idx 1) 与摆动低点 90 (idx 2)，窗口内先收于 101 再收于 89
    let candles = vec![
        bar(0, 93.0, 95.0, 92.0, 93.0),
        bar(1, 93.0, 100.0, 93.0, 94.0),
        bar(2, 94.0, 97.0, 90.0, 91.0),
        bar(3, 91.0, 98.0, 91.0, 95.0),
        bar(4, 95.0, 101.2, 94.0, 101.0),
        bar(5, 101.0, 101.5, 88.0, 89.0),
    ];
    let params = BosParams {
        left: 1,
        right: 1,
        lookback: 3,
    };
    let event = detect_bos(&candles, &params).unwrap();
    assert_eq!(event.direction, Direction::Long);
    assert_close(event.broken_level, 100.0);
    assert_eq!(event.break_time, t(4));
}

#[test]
fn test_true_range_and_atr() {
    let candles = vec![
        bar(0, 9.5, 10.0, 9.0, 9.5),
        bar(1, 11.0, 12.0, 11.0, 11.5),
        bar(2, 11.5, 12.0, 11.5, 12.0),
    ];
    let tr = true_range(&candles);
    assert_close(tr[0], 1.0);
    assert_close(tr[1], 2.5);
    assert_close(tr[2], 0.5);

    let series = atr_series(&candles, 2);
    assert_close(series[0], 1.0);
    assert_close(series[1], 1.75);
    assert_close(series[2], 1.5);

    // 窗口不足时按已有根数求均值
    assert_close(atr(&candles, 14).unwrap(), 4.0 / 3.0);
    assert!(atr(&[], 14).is_none());
    assert!(atr(&candles, 0).is_none());
}

fn long_event(close: f64) -> BosEvent {
    BosEvent {
        direction: Direction::Long,
        broken_level: 100.0,
        break_time: t(9),
        confirming_close: close,
        confirming_open: close - 1.0,
    }
}

#[test]
fn test_levels_worked_example() {
    let levels = compute_levels(&long_event(105.0), &[], 2.0, &LevelParams::default()).unwrap();
    assert_close(levels.stop, 99.0);
    assert_close(levels.zone_high, 103.09);
    assert_close(levels.zone_low, 101.07);
    assert_close(levels.entry, 103.09);
    assert_close(levels.risk, 4.09);
    assert_close(levels.tp1, 107.18);
    assert_close(levels.tp2, 111.27);
    assert_close(levels.tp3, 115.36);
    assert_close(levels.rr_tp2, 2.0);
    assert_ordered_long(&levels);
}

#[test]
fn test_levels_short_are_reversed() {
    let event = BosEvent {
        direction: Direction::Short,
        broken_level: 100.0,
        break_time: t(9),
        confirming_close: 95.0,
        confirming_open: 96.0,
    };
    let levels = compute_levels(&event, &[], 2.0, &LevelParams::default()).unwrap();
    assert_close(levels.zone_low, 96.91);
    assert_close(levels.zone_high, 98.93);
    assert_close(levels.entry, 98.93);
    assert_close(levels.stop, 101.0);
    assert!(levels.risk > 0.0);
    assert!(levels.stop > levels.entry);
    assert!(levels.entry > levels.tp1);
    assert!(levels.tp1 > levels.tp2);
    assert!(levels.tp2 > levels.tp3);
    assert!(levels.zone_low <= levels.zone_high);
    assert_close(levels.rr_tp2, 2.0);
}

#[test]
fn test_levels_zero_impulse_uses_pct_change_fallback() {
    let candles = vec![
        bar(0, 98.0, 99.5, 97.5, 99.0),
        bar(1, 99.0, 100.5, 98.5, 100.0),
        bar(2, 100.0, 100.5, 99.5, 100.0),
    ];
    let levels = compute_levels(&long_event(100.0), &candles, 2.0, &LevelParams::default()).unwrap();
    let impulse = 1.0 / 99.0;
    assert_close(levels.zone_high, 100.0 - impulse * 0.382);
    assert_close(levels.zone_low, 100.0 - impulse * 0.786);
    assert_ordered_long(&levels);
}

#[test]
fn test_levels_degenerate_cases() {
    let flat = vec![bar(0, 100.0, 100.0, 100.0, 100.0), bar(1, 100.0, 100.0, 100.0, 100.0)];
    assert!(matches!(
        compute_levels(&long_event(100.0), &flat, 2.0, &LevelParams::default()),
        Err(AnalysisError::NumericDegeneracy(_))
    ));

    // 最后收盘跌回突破位下方，止损高于入场
    assert!(matches!(
        compute_levels(&long_event(90.0), &[], 2.0, &LevelParams::default()),
        Err(AnalysisError::NumericDegeneracy(_))
    ));

    assert!(matches!(
        compute_levels(&long_event(105.0), &[], f64::NAN, &LevelParams::default()),
        Err(AnalysisError::InvalidParams(_))
    ));
}

#[test]
fn test_level_params_validation() {
    assert!(LevelParams::default().validate().is_ok());
    let inverted = LevelParams {
        low_frac: 0.8,
        high_frac: 0.5,
        atr_buffer: 0.5,
    };
    assert!(inverted.validate().is_err());
    let negative_buffer = LevelParams {
        atr_buffer: -1.0,
        ..LevelParams::default()
    };
    assert!(negative_buffer.validate().is_err());
}

#[test]
fn test_pullback_overlap_is_inclusive() {
    assert!(in_zone(&bar(0, 10.0, 11.0, 9.0, 10.0), 10.0, 12.0));
    assert!(!in_zone(&bar(0, 13.0, 14.0, 13.0, 13.5), 10.0, 12.0));
    assert!(in_zone(&bar(0, 12.5, 13.0, 12.0, 12.5), 10.0, 12.0));
    assert!(in_zone(&bar(0, 9.0, 10.0, 8.0, 9.5), 10.0, 12.0));

    let levels = compute_levels(&long_event(105.0), &[], 2.0, &LevelParams::default()).unwrap();
    assert!(!is_pulled_back(&[], &levels));
    let ltf = vec![
        bar(0, 104.0, 105.0, 103.5, 104.0),
        bar(1, 104.0, 104.2, 102.8, 103.0),
    ];
    assert!(is_pulled_back(&ltf, &levels));
    assert!(!is_pulled_back(&ltf[..1], &levels));
}

fn assert_ordered_long(levels: &LevelSet) {
    assert!(levels.risk > 0.0);
    assert!(levels.stop < levels.entry);
    assert!(levels.entry < levels.tp1);
    assert!(levels.tp1 < levels.tp2);
    assert!(levels.tp2 < levels.tp3);
    assert!(levels.zone_low <= levels.zone_high);
}
