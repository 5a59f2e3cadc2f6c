//! # `kizashi-api` - HTTP 入口
//!
//! 扫描器对外的 HTTP 服务。
//! 使用 `axum` 构建路由，通过 `utoipa` 生成 OpenAPI 3.0 文档。
//!
//! ## 架构职责
//! - 接收 TradingView 等外部系统的 webhook，校验 `X-Secret` 后临时触发单个标的的扫描
//! - 提供健康检查与最近信号查询
//! - 本身不做任何分析，所有业务都委托给 `ScanOrchestrator`

pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;
