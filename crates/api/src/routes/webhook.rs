//! # Webhook 路由
//!
//! 接收 TradingView 告警，立即为指定标的排队一次扫描。

use axum::Json;
use axum::extract::State;

use crate::server::AppState;
use crate::types::{WebhookRequest, WebhookResponse};

/// 触发单个标的的即时扫描
///
/// 扫描在后台运行，本接口立即返回；结果只写日志。
#[utoipa::path(
    post,
    path = "/webhook",
    tag = "触发 (Trigger)",
    request_body = WebhookRequest,
    params(
        ("X-Secret" = Option<String>, Header, description = "共享密钥，配置后必填")
    ),
    responses(
        (status = 200, description = "已排队或已忽略", body = WebhookResponse),
        (status = 401, description = "密钥不匹配")
    )
)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    Json(req): Json<WebhookRequest>,
) -> Json<WebhookResponse> {
    let symbol = req
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let Some(symbol) = symbol else {
        tracing::debug!(event = ?req.event, "webhook without symbol ignored");
        return Json(WebhookResponse::ignored());
    };

    tracing::info!(
        symbol,
        timeframe = ?req.timeframe,
        event = ?req.event,
        "webhook queued scan"
    );
    // 句柄不需要等待，任务结果由编排器记录
    drop(state.orchestrator.trigger(symbol.to_string()));
    Json(WebhookResponse::queued(symbol.to_string()))
}
