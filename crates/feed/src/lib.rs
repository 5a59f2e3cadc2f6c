//! # `kizashi-feed` - 行情数据源
//!
//! `MarketDataProvider` 的两个实现：在线的 Yahoo Finance 与本地 CSV 文件。

pub mod csv;
pub mod resample;
pub mod symbols;
pub mod yahoo;
