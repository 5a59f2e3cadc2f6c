//! # `kizashi-store` - 持久化
//!
//! `SignalStore` 与 `SymbolStore` 的实现：SQLite (生产) 与内存 (测试、演练)。

pub mod config;
pub mod memory;
pub mod signal;
