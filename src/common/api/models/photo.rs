use serde::{Deserialize, Serialize};

pub const PHOTO_STATUS_PROCESSING: &str = "processing";

/// 证件照处理任务，上传和状态查询返回同一结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub id: i64,
    pub job_id: String,
    pub preset: String,
    pub status: String,
    pub original_url: String,
    #[serde(default)]
    pub result_hd_url: Option<String>,
    /// 状态查询地址，轮询时直接GET这个URL
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub dimension: Option<String>,
}

impl PhotoResponse {
    pub fn is_processing(&self) -> bool {
        self.status == PHOTO_STATUS_PROCESSING
    }
}
