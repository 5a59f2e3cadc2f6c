//! # Webhook 密钥校验
//!
//! 校验请求头 `X-Secret` 与配置的共享密钥是否一致。

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::server::AppState;

/// 携带共享密钥的请求头
pub const SECRET_HEADER: &str = "x-secret";

/// # Summary
/// 密钥校验中间件。
///
/// # Logic
/// 1. 未配置密钥时直接放行。
/// 2. 已配置时要求 `X-Secret` 与之完全一致，否则在进入 Handler 之前返回 401。
pub async fn require_secret(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.webhook_secret.as_deref() {
        let provided = req
            .headers()
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !secret_matches(expected, provided) {
            tracing::warn!(path = %req.uri().path(), "rejected request with invalid secret");
            return Err(ApiError::Unauthorized("Invalid secret".into()));
        }
    }
    Ok(next.run(req).await)
}

/// 比较两个密钥的 SHA-256 摘要，耗时与密钥内容无关
pub fn secret_matches(expected: &str, provided: &str) -> bool {
    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(provided.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
