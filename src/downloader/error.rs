use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("没有可用的下载地址: {0}")]
    NoDownloadUrl(String),

    #[error("HTTP 请求失败，状态码: {0}")]
    HttpStatus(u16),

    #[error("流读取错误: {0}")]
    Stream(String),

    #[error("任务已取消")]
    Cancelled,
}
