use crate::resample::resample;
use crate::symbols::to_yahoo_symbol;
use async_trait::async_trait;
use chrono::DateTime;
use kizashi_core::common::TimeFrame;
use kizashi_core::market::entity::Candle;
use kizashi_core::market::error::MarketError;
use kizashi_core::market::port::MarketDataProvider;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// # Summary
/// Yahoo Finance 行情提供者实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，单次请求 10 秒超时。
/// - 2h / 4h 周期由 60m K 线在本地按 UTC 对齐合并而来。
#[derive(Clone)]
pub struct YahooProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
    // chart 接口的 range 参数，如 "45d"
    range: String,
}

impl YahooProvider {
    /// # Summary
    /// 创建一个新的 YahooProvider 实例。
    ///
    /// # Logic
    /// 1. 配置 10 秒超时。
    /// 2. 设置浏览器 User-Agent 以减少被拦截。
    /// 3. 初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `range` - 请求的历史跨度，如 "45d"。
    ///
    /// # Returns
    /// 客户端构建失败时返回 `MarketError::Network`。
    pub fn new(range: &str) -> Result<Self, MarketError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| MarketError::Network(e.to_string()))?;

        Ok(Self {
            client,
            range: range.to_string(),
        })
    }

    /// 请求 Yahoo 原生支持的周期
    async fn fetch_native(&self, ticker: &str, interval: &str) -> Result<Vec<Candle>, MarketError> {
        let url = format!("{}/{}", CHART_URL, ticker);

        let resp = self
            .client
            .get(&url)
            .query(&[("range", self.range.as_str()), ("interval", interval)])
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(MarketError::Network(format!("HTTP {}", resp.status())));
        }

        let json: YahooResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        parse_chart(json)
    }
}

/// # Summary
/// Yahoo API 响应顶层结构。
///
/// # Invariants
/// - 映射自 Yahoo v8 chart 接口。
#[derive(Deserialize, Debug)]
struct YahooResponse {
    chart: YahooChart,
}

#[derive(Deserialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug)]
struct YahooError {
    description: String,
}

#[derive(Deserialize, Debug)]
struct YahooResult {
    // 无交易时段时 Yahoo 会省略该字段
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Deserialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

/// # Summary
/// Yahoo API 原始报价数据，缺失值为 null。
#[derive(Deserialize, Debug)]
struct YahooQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// # Summary
/// 将 chart 响应转换为 K 线序列。
///
/// # Logic
/// 1. 接口返回 error 时转为 `MarketError::Unknown`。
/// 2. OHLC 任一为 null 的行被跳过；成交量缺失按 0 处理 (外汇无成交量)。
/// 3. 按时间去重并保持升序。
fn parse_chart(json: YahooResponse) -> Result<Vec<Candle>, MarketError> {
    if let Some(err) = json.chart.error {
        return Err(MarketError::Unknown(err.description));
    }

    let result = json
        .chart
        .result
        .and_then(|mut r| r.pop())
        .ok_or(MarketError::NotFound)?;

    let quote = result
        .indicators
        .quote
        .first()
        .ok_or(MarketError::Parse("No quote data".into()))?;

    let mut candles: Vec<Candle> = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            quote.open.get(i).copied().flatten(),
            quote.high.get(i).copied().flatten(),
            quote.low.get(i).copied().flatten(),
            quote.close.get(i).copied().flatten(),
        ) else {
            continue;
        };
        let Some(time) = DateTime::from_timestamp(ts, 0) else {
            continue;
        };
        if candles.last().is_some_and(|last| last.time >= time) {
            continue;
        }
        candles.push(Candle {
            time,
            open,
            high,
            low,
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0.0),
        });
    }

    Ok(candles)
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    /// # Summary
    /// 从 Yahoo Finance 抓取最近的 K 线。
    ///
    /// # Logic
    /// 1. 将标的名称映射为 Yahoo 代码。
    /// 2. 15m / 5m 直接请求；2h / 4h 请求 60m 后本地合并。
    /// 3. 截取最近 `count` 根。
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let ticker = to_yahoo_symbol(symbol);
        let candles = match timeframe {
            TimeFrame::Minute5 => self.fetch_native(&ticker, "5m").await?,
            TimeFrame::Minute15 => self.fetch_native(&ticker, "15m").await?,
            TimeFrame::Hour2 | TimeFrame::Hour4 => {
                let hourly = self.fetch_native(&ticker, "60m").await?;
                resample(&hourly, timeframe.seconds())
            }
        };

        debug!(
            symbol,
            ticker = %ticker,
            timeframe = %timeframe,
            bars = candles.len(),
            "yahoo candles fetched"
        );

        let skip = candles.len().saturating_sub(count);
        Ok(candles.into_iter().skip(skip).collect())
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}
