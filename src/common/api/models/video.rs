use serde::{Deserialize, Serialize};

/// 解析接口的标准返回格式，code = 0 表示成功
#[derive(Debug, Clone, Deserialize)]
pub struct TikTokVideoResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub processed_time: f64,
    pub data: Option<TikTokVideoData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokVideoData {
    pub id: String,
    pub title: String,
    pub cover: String,
    pub duration: i64,
    /// 高清直链及其大小
    pub hdplay: String,
    pub hd_size: i64,
    /// 普清直链及其大小
    pub play: String,
    pub size: i64,
    pub author: VideoAuthor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAuthor {
    pub id: String,
    pub unique_id: String,
    pub nickname: String,
    pub avatar: String,
}
