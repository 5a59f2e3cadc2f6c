use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理数据库连接、读写失败与脏数据。
///
/// # Invariants
/// - 唯一约束冲突不属于错误，由实现方转换为 "未插入"。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 数据库操作失败
    #[error("Database error: {0}")]
    Database(String),
    /// 记录未找到
    #[error("Not found: {0}")]
    NotFound(String),
    /// 行数据无法还原为领域实体 (如未知的方向字符串)
    #[error("Corrupted row: {0}")]
    Corrupted(String),
    /// 初始化存储失败
    #[error("Initialization error: {0}")]
    InitError(String),
}
