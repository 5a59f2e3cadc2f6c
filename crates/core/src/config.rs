use crate::common::TimeFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 配置校验错误
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// # Summary
/// 全局应用配置。
///
/// # Logic
/// 每个分区都实现了 `Default`，并且字段级 `#[serde(default)]`，
/// 因此配置文件与环境变量只需覆盖需要修改的键。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub scanner: ScannerConfig,
    pub notify: NotifyConfig,
    pub symbols: SymbolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    // 为空表示不校验 X-Secret
    pub webhook_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            webhook_secret: None,
        }
    }
}

impl ServerConfig {
    /// 监听地址 `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 共享密钥，空白视为未配置
    pub fn secret(&self) -> Option<String> {
        non_empty(&self.webhook_secret)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

/// 行情源种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    #[serde(alias = "yf")]
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    // CsvProvider 的数据目录
    pub csv_dir: String,
    // Yahoo chart API 的 range 参数
    pub yahoo_range: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Yahoo,
            csv_dir: "data/csv".to_string(),
            yahoo_range: "45d".to_string(),
        }
    }
}

/// 并发扫描许可数的上限，远低于 tokio 信号量允许的最大值
pub const MAX_CONCURRENT: usize = 4096;

/// # Summary
/// 扫描与分析参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub htf: TimeFrame,
    pub ltf: TimeFrame,
    pub htf_count: usize,
    pub ltf_count: usize,
    pub swing_left: usize,
    pub swing_right: usize,
    pub lookback: usize,
    pub retracement_low: f64,
    pub retracement_high: f64,
    pub atr_period: usize,
    pub atr_stop_buffer: f64,
    pub max_concurrent: usize,
    pub scan_interval_secs: u64,
    // 每 N 轮发送一次状态报告，0 表示关闭
    pub heartbeat_every: u64,
    // TP2 盈亏比低于该值时不发回踩提醒，0 表示不过滤
    pub min_rr_alert: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            htf: TimeFrame::Hour4,
            ltf: TimeFrame::Minute15,
            htf_count: 200,
            ltf_count: 200,
            swing_left: 3,
            swing_right: 3,
            lookback: 5,
            retracement_low: 0.382,
            retracement_high: 0.786,
            atr_period: 14,
            atr_stop_buffer: 0.5,
            max_concurrent: 10,
            scan_interval_secs: 300,
            heartbeat_every: 0,
            min_rr_alert: 0.0,
        }
    }
}

/// 通知渠道凭据，缺失则不启用对应渠道
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_whatsapp_from: Option<String>,
    pub twilio_whatsapp_to: Option<String>,
}

impl NotifyConfig {
    /// Telegram 凭据 (token, chat_id)，任一为空则返回 None
    pub fn telegram(&self) -> Option<(String, String)> {
        Some((
            non_empty(&self.telegram_bot_token)?,
            non_empty(&self.telegram_chat_id)?,
        ))
    }

    /// Twilio 凭据 (sid, token, from, to)，任一为空则返回 None
    pub fn whatsapp(&self) -> Option<(String, String, String, String)> {
        Some((
            non_empty(&self.twilio_account_sid)?,
            non_empty(&self.twilio_auth_token)?,
            non_empty(&self.twilio_whatsapp_from)?,
            non_empty(&self.twilio_whatsapp_to)?,
        ))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolsConfig {
    // 逗号分隔的初始标的
    pub seed: String,
    // 每行一个标的，# 开头为注释
    pub seed_file: Option<String>,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            seed: "EURUSD=X,GBPUSD=X,AAPL,SPY".to_string(),
            seed_file: None,
        }
    }
}

impl SymbolsConfig {
    /// 拆分逗号分隔的初始标的，忽略空项
    pub fn seed_list(&self) -> Vec<String> {
        self.seed
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// # Summary
/// 解析种子文件内容：每行一个标的，`#` 之后为注释。
pub fn parse_seed_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| line.split('#').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    /// # Summary
    /// 校验配置是否可用于启动。
    ///
    /// # Logic
    /// 1. HTF 必须为 4h/2h，LTF 必须为 15m/5m。
    /// 2. 回撤比例满足 0 < low < high。
    /// 3. 窗口、周期与并发数均不能为 0。
    /// 4. 并发数不超过 `MAX_CONCURRENT`。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scanner;
        if !s.htf.is_higher() {
            return Err(ConfigError::Invalid(format!(
                "scanner.htf must be 4h or 2h, got {}",
                s.htf
            )));
        }
        if s.ltf.is_higher() {
            return Err(ConfigError::Invalid(format!(
                "scanner.ltf must be 15m or 5m, got {}",
                s.ltf
            )));
        }
        if !(s.retracement_low > 0.0 && s.retracement_low < s.retracement_high) {
            return Err(ConfigError::Invalid(format!(
                "retracement fractions must satisfy 0 < low < high, got {} / {}",
                s.retracement_low, s.retracement_high
            )));
        }
        if !(s.atr_stop_buffer >= 0.0 && s.atr_stop_buffer.is_finite()) {
            return Err(ConfigError::Invalid(
                "scanner.atr_stop_buffer must be >= 0".to_string(),
            ));
        }
        let windows = [
            ("swing_left", s.swing_left),
            ("swing_right", s.swing_right),
            ("lookback", s.lookback),
            ("atr_period", s.atr_period),
            ("htf_count", s.htf_count),
            ("ltf_count", s.ltf_count),
            ("max_concurrent", s.max_concurrent),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("scanner.{} must be > 0", name)));
        }
        if s.max_concurrent > MAX_CONCURRENT {
            return Err(ConfigError::Invalid(format!(
                "scanner.max_concurrent must be <= {}, got {}",
                MAX_CONCURRENT, s.max_concurrent
            )));
        }
        if s.scan_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scanner.scan_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
