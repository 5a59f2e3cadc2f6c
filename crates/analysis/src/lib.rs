//! # `kizashi-analysis` - 结构分析
//!
//! 纯计算模块：摆动点、结构突破 (BOS)、ATR、入场价位与回踩判定。
//! 不做任何 I/O，输入相同则输出相同，可在每一轮扫描中重复调用。

pub mod atr;
pub mod bos;
pub mod error;
pub mod levels;
pub mod pullback;
pub mod swing;

pub use atr::atr;
pub use bos::{BosParams, detect_bos};
pub use error::AnalysisError;
pub use levels::{LevelParams, compute_levels};
pub use pullback::is_pulled_back;
pub use swing::{find_swings, swing_points};

/// 将长度转为 f64，超出 u32 范围时返回 None
pub(crate) fn len_as_f64(len: usize) -> Option<f64> {
    u32::try_from(len).ok().map(f64::from)
}
