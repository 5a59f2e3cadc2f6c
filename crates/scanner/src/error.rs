use kizashi_analysis::AnalysisError;
use kizashi_core::market::error::MarketError;
use kizashi_core::store::error::StoreError;
use thiserror::Error;

/// # Summary
/// 扫描流水线的统一错误类型。单个标的的错误只影响该标的。
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Market error: {0}")]
    Market(#[from] MarketError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Concurrency limiter closed")]
    LimiterClosed,
}
