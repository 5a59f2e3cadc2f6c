use kizashi_core::market::entity::Candle;

/// # Summary
/// 将细粒度 K 线合并为按 UTC 对齐的粗粒度 K 线。
///
/// # Logic
/// 1. 桶起点 = 时间戳向下取整到 `bucket_secs` 的整数倍。
/// 2. 开盘取桶内第一根，收盘取最后一根，最高/最低取极值，成交量求和。
/// 3. 最后一个桶可能尚未走完，同样输出。
///
/// # Arguments
/// * `candles` - 按时间升序的细粒度 K 线。
/// * `bucket_secs` - 目标周期秒数，必须大于 0。
///
/// # Returns
/// 按时间升序的合并结果；`bucket_secs <= 0` 时返回空。
pub fn resample(candles: &[Candle], bucket_secs: i64) -> Vec<Candle> {
    let mut out: Vec<Candle> = Vec::new();
    if bucket_secs <= 0 {
        return out;
    }

    for c in candles {
        let ts = c.time.timestamp();
        let bucket_ts = ts - ts.rem_euclid(bucket_secs);
        let Some(bucket_time) = chrono::DateTime::from_timestamp(bucket_ts, 0) else {
            continue;
        };

        match out.last_mut() {
            Some(current) if current.time == bucket_time => {
                current.high = current.high.max(c.high);
                current.low = current.low.min(c.low);
                current.close = c.close;
                current.volume += c.volume;
            }
            _ => out.push(Candle {
                time: bucket_time,
                ..c.clone()
            }),
        }
    }

    out
}
