//! # `kizashi-core` - 领域核心
//!
//! 定义扫描器的领域实体、端口 (Port) 与错误类型。
//! 其余 crate 只依赖这里的 Trait，具体实现由 `kizashi-app` 在启动时注入。

pub mod common;
pub mod config;
pub mod market;
pub mod notify;
pub mod signal;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod test_utils;
