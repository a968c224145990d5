use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("数据库错误: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("数据库查询失败: {0}")]
    Query(#[from] rusqlite::Error),

    // 补丁违反了记录不变量，拒绝写入
    #[error("无效的更新补丁: {0}")]
    InvalidPatch(String),
}
