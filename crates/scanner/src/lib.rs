//! # `kizashi-scanner` - 扫描编排
//!
//! 应用服务层：把行情、分析、存储与通知串成每个标的的扫描流水线，
//! 并负责周期循环与临时触发。编译期只依赖 `kizashi-core` 中的 Trait。

pub mod dispatch;
pub mod error;
pub mod orchestrator;

pub use dispatch::NotificationDispatcher;
pub use error::ScanError;
pub use orchestrator::{CycleReport, ScanOrchestrator, ScanOutcome, ScanSettings};
