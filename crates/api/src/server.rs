//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 由 `crates/app` 的 DI 容器持有并调用。

use std::sync::Arc;

use axum::Router;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use kizashi_core::store::port::SignalStore;
use kizashi_scanner::ScanOrchestrator;

use crate::routes::{signal, system, webhook};

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - `webhook_secret` 为 None 时不校验密钥；空字符串应在构造前过滤掉。
#[derive(Clone)]
pub struct AppState {
    /// 扫描编排器，webhook 通过它排队扫描
    pub orchestrator: Arc<ScanOrchestrator>,
    /// 信号存储 (只读查询)
    pub signals: Arc<dyn SignalStore>,
    /// 共享密钥
    pub webhook_secret: Option<String>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kizashi Scanner API",
        version = "0.1.0",
        description = "结构突破扫描器的 HTTP 入口：webhook 触发、健康检查与信号查询。",
        license(name = "MIT")
    ),
    tags(
        (name = "触发 (Trigger)", description = "外部告警触发即时扫描"),
        (name = "信号 (Signal)", description = "已记录信号的只读查询"),
        (name = "系统 (System)", description = "存活检查")
    )
)]
pub struct ApiDoc;

// ============================================================
//  服务构建与启动
// ============================================================

/// # Summary
/// 构建完整的路由树 (含 Swagger UI)。
///
/// # Logic
/// 1. `/health` 公开。
/// 2. `/webhook` 与 `/signals` 挂载密钥校验中间件，校验失败不会进入 Handler。
pub fn build_router(state: AppState) -> Router {
    let public_router = OpenApiRouter::new().routes(routes!(system::health));

    let protected_router = OpenApiRouter::new()
        .routes(routes!(webhook::receive_webhook))
        .routes(routes!(signal::list_recent_signals))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::secret::require_secret,
        ));

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(public_router)
        .merge(protected_router)
        .with_state(state)
        .split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
}

/// # Summary
/// 绑定端口并启动 HTTP 服务，直到关闭信号到达。
///
/// # Arguments
/// * `state` - 由 DI 容器注入的共享状态。
/// * `bind_addr` - 监听地址，如 `"0.0.0.0:8000"`。
/// * `shutdown` - 值变为 true 时优雅退出。
pub async fn start_server(
    state: AppState,
    bind_addr: &str,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = build_router(state);

    tracing::info!("Kizashi API listening on {}", bind_addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    Ok(())
}
