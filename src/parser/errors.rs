use thiserror::Error;

// 错误信息直接面向用户展示，保持原文
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Please enter a TikTok URL")]
    EmptyUrl,
    #[error("Please enter a valid TikTok URL")]
    InvalidUrl,
}
