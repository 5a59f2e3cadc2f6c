use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use kizashi_core::common::TimeFrame;
use kizashi_core::market::entity::Candle;
use kizashi_core::market::error::MarketError;
use kizashi_core::market::port::MarketDataProvider;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// # Summary
/// 从本地 CSV 文件读取 K 线的行情提供者，用于离线回放与测试。
///
/// # Invariants
/// - 文件路径为 `<dir>/<SYMBOL>_<tf>.csv`，如 `data/csv/EURUSD=X_4h.csv`。
/// - 表头为 `timestamp,open,high,low,close,volume`，volume 可为空。
/// - 文件不存在视为数据缺失，返回空序列。
pub struct CsvProvider {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<f64>,
}

impl CsvProvider {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// 某个组合对应的文件路径
    pub fn path_for(&self, symbol: &str, timeframe: TimeFrame) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", symbol, timeframe))
    }
}

/// # Summary
/// 解析时间戳列。
///
/// # Logic
/// 依次尝试：Unix 秒、RFC 3339、`%Y-%m-%d %H:%M:%S` (按 UTC 解释)。
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, MarketError> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| MarketError::Parse(format!("timestamp out of range: {}", raw)));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| MarketError::Parse(format!("bad timestamp {}: {}", raw, e)))
}

/// 解析 CSV 内容，按时间排序并去重
pub fn parse_candles(content: &str) -> Result<Vec<Candle>, MarketError> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut candles = Vec::new();
    for record in reader.deserialize::<CsvRow>() {
        let row = record.map_err(|e| MarketError::Parse(e.to_string()))?;
        candles.push(Candle {
            time: parse_timestamp(&row.timestamp)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.unwrap_or(0.0),
        });
    }
    candles.sort_by_key(|c| c.time);
    candles.dedup_by_key(|c| c.time);
    Ok(candles)
}

#[async_trait]
impl MarketDataProvider for CsvProvider {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let path = self.path_for(symbol, timeframe);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(symbol, timeframe = %timeframe, path = %path.display(), "csv file missing");
                return Ok(Vec::new());
            }
            Err(e) => return Err(MarketError::Unknown(e.to_string())),
        };

        let candles = parse_candles(&content)?;
        let skip = candles.len().saturating_sub(count);
        Ok(candles.into_iter().skip(skip).collect())
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}
