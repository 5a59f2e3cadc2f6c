//! # DTO (Data Transfer Object) 层
//!
//! 所有 DTO 派生 `utoipa::ToSchema` 以进入 Swagger 文档。

use chrono::{DateTime, Utc};
use kizashi_core::signal::entity::Signal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================
//  Webhook
// ============================================================

/// TradingView 告警请求体，字段均可缺省
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct WebhookRequest {
    /// 需要立即扫描的标的
    #[schema(example = "EURUSD=X")]
    pub symbol: Option<String>,
    /// 告警来源周期，仅记录日志
    #[schema(example = "4h")]
    pub timeframe: Option<String>,
    /// 告警事件名，仅记录日志
    #[schema(example = "bos")]
    pub event: Option<String>,
}

/// Webhook 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    /// queued 或 ignored
    #[schema(example = "queued")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl WebhookResponse {
    pub fn queued(symbol: String) -> Self {
        Self {
            status: "queued".to_string(),
            symbol: Some(symbol),
        }
    }

    pub fn ignored() -> Self {
        Self {
            status: "ignored".to_string(),
            symbol: None,
        }
    }
}

// ============================================================
//  系统
// ============================================================

/// 健康检查响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

// ============================================================
//  信号
// ============================================================

/// 信号 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignalResponse {
    #[schema(example = "EURUSD=X")]
    pub symbol: String,
    /// 首次突破收盘的 K 线时间
    pub bos_time: DateTime<Utc>,
    /// long / short
    #[schema(example = "long")]
    pub direction: String,
    pub entry: f64,
    pub zone_low: f64,
    pub zone_high: f64,
    pub stop: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub tp3: f64,
    pub rr_tp2: f64,
    pub pulled_back: bool,
    pub notified_bos: bool,
    pub notified_market: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Signal> for SignalResponse {
    fn from(s: Signal) -> Self {
        Self {
            symbol: s.symbol,
            bos_time: s.bos_time,
            direction: s.direction.as_str().to_string(),
            entry: s.entry,
            zone_low: s.zone_low,
            zone_high: s.zone_high,
            stop: s.stop,
            tp1: s.tp1,
            tp2: s.tp2,
            tp3: s.tp3,
            rr_tp2: s.rr_tp2,
            pulled_back: s.pulled_back,
            notified_bos: s.notified_bos,
            notified_market: s.notified_market,
            created_at: s.created_at,
        }
    }
}

// ============================================================
//  通用响应
// ============================================================

/// 统一 API 响应包装器
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    /// 是否成功
    pub success: bool,
    /// 数据载荷 (成功时)
    pub data: Option<T>,
    /// 错误信息 (失败时)
    pub error: Option<String>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    /// 构建成功响应
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// 失败响应 (不含泛型载荷)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 错误描述信息
    pub error: String,
}

impl ApiErrorResponse {
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}
