//! # 信号查询路由
//!
//! 只读接口，按创建时间倒序返回最近的信号，便于人工复核。

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiResponse, SignalResponse};

/// 单次查询的最大条数
const MAX_LIMIT: usize = 500;

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentSignalsQuery {
    /// 返回数量，默认 50，最大 500
    pub limit: Option<usize>,
}

/// 列出最近的信号
#[utoipa::path(
    get,
    path = "/signals",
    tag = "信号 (Signal)",
    params(
        RecentSignalsQuery,
        ("X-Secret" = Option<String>, Header, description = "共享密钥，配置后必填")
    ),
    responses(
        (status = 200, description = "获取成功", body = ApiResponse<Vec<SignalResponse>>),
        (status = 401, description = "密钥不匹配")
    )
)]
pub async fn list_recent_signals(
    State(state): State<AppState>,
    Query(query): Query<RecentSignalsQuery>,
) -> Result<Json<ApiResponse<Vec<SignalResponse>>>, ApiError> {
    let limit = query.limit.unwrap_or(50);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be within 1..={}",
            MAX_LIMIT
        )));
    }
    let signals = state.signals.list_recent(limit).await?;
    Ok(Json(ApiResponse::ok(
        signals.into_iter().map(SignalResponse::from).collect(),
    )))
}
