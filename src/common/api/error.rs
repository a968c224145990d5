use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("网络请求失败: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("响应解析失败: {0}")]
    InvalidResponse(String),

    #[error("HTTP 请求失败，状态码: {0}")]
    HttpStatus(u16),

    // 解析接口返回 code != 0
    #[error("API错误 (code={code}): {message}")]
    Api {
        code: i64,
        message: String,
        video_id: Option<String>,
    },
}

impl ApiError {
    /// 统一对外暴露一个类HTTP状态码
    pub fn status(&self) -> i64 {
        match self {
            ApiError::Reqwest(_) => 500,
            ApiError::InvalidResponse(_) => 500,
            ApiError::HttpStatus(status) => i64::from(*status),
            ApiError::Api { code, .. } => *code,
        }
    }

    pub fn video_id(&self) -> Option<&str> {
        match self {
            ApiError::Api { video_id, .. } => video_id.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}
