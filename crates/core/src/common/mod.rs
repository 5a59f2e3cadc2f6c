use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub mod time;

/// # Summary
/// 扫描使用的 K 线周期。
///
/// # Invariants
/// - 高周期 (HTF) 只允许 `Hour4` / `Hour2`，低周期 (LTF) 只允许 `Minute15` / `Minute5`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeFrame {
    // 5分钟
    #[serde(rename = "5m")]
    Minute5,
    // 15分钟
    #[serde(rename = "15m")]
    Minute15,
    // 2小时
    #[serde(rename = "2h")]
    Hour2,
    // 4小时
    #[serde(rename = "4h")]
    Hour4,
}

impl TimeFrame {
    /// 单根 K 线覆盖的秒数
    pub fn seconds(&self) -> i64 {
        match self {
            TimeFrame::Minute5 => 300,
            TimeFrame::Minute15 => 900,
            TimeFrame::Hour2 => 7_200,
            TimeFrame::Hour4 => 14_400,
        }
    }

    /// 是否可作为结构判定用的高周期
    pub fn is_higher(&self) -> bool {
        matches!(self, TimeFrame::Hour2 | TimeFrame::Hour4)
    }
}

impl FromStr for TimeFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5m" | "minute5" => Ok(TimeFrame::Minute5),
            "15m" | "minute15" => Ok(TimeFrame::Minute15),
            "2h" | "hour2" => Ok(TimeFrame::Hour2),
            "4h" | "hour4" => Ok(TimeFrame::Hour4),
            _ => Err(format!("Unknown TimeFrame: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeFrame::Minute5 => write!(f, "5m"),
            TimeFrame::Minute15 => write!(f, "15m"),
            TimeFrame::Hour2 => write!(f, "2h"),
            TimeFrame::Hour4 => write!(f, "4h"),
        }
    }
}

/// # Summary
/// 为 rustls 安装进程级默认加密后端 (ring)。
///
/// # Logic
/// reqwest 以 `rustls-no-provider` 方式编译，发起 HTTPS 请求前必须先安装。
/// 重复调用是安全的，已安装时直接忽略。
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse_and_display() {
        for tf in [
            TimeFrame::Minute5,
            TimeFrame::Minute15,
            TimeFrame::Hour2,
            TimeFrame::Hour4,
        ] {
            assert_eq!(tf.to_string().parse::<TimeFrame>(), Ok(tf));
        }
        assert_eq!("4H".parse::<TimeFrame>(), Ok(TimeFrame::Hour4));
        assert!("1d".parse::<TimeFrame>().is_err());
    }

    #[test]
    fn test_timeframe_serde_uses_literals() {
        let json = serde_json::to_string(&TimeFrame::Minute15).unwrap();
        assert_eq!(json, "\"15m\"");
        let tf: TimeFrame = serde_json::from_str("\"2h\"").unwrap();
        assert_eq!(tf, TimeFrame::Hour2);
    }
}
