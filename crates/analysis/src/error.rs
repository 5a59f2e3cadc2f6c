use thiserror::Error;

/// # Summary
/// 分析计算的错误枚举。
///
/// # Invariants
/// - 数据不足不属于错误，相关函数以 `None` 表示 "没有结果"。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// 计算出的价位非有限值，或风险无法保持为正
    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),
    /// 参数不满足约束
    #[error("Invalid params: {0}")]
    InvalidParams(String),
}
