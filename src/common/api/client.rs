use std::path::Path;
use std::time::Duration;

use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, ClientBuilder};
use tracing::{debug, error};

use super::error::ApiError;
use super::models::photo::PhotoResponse;
use super::models::video::{TikTokVideoData, TikTokVideoResponse};
use crate::parser::UrlParser;

pub const RESOLVER_API_URL: &str = "https://www.tikwm.com/api/";
pub const RESOLVER_HOST: &str = "https://www.tikwm.com/";

const DESKTOP_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36 Edg/133.0.0.0";

/// 解析接口 + 证件照接口的HTTP客户端，无状态，可随意克隆
#[derive(Debug, Clone)]
pub struct MediaApiClient {
    inner: Client,
    resolver_url: String,
}

impl MediaApiClient {
    pub fn new() -> Result<Self, ApiError> {
        let inner = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .default_headers(Self::default_headers())
            .build()?;

        Ok(Self {
            inner,
            resolver_url: RESOLVER_API_URL.to_string(),
        })
    }

    /// 测试用：把解析接口指到本地
    pub fn with_resolver_url(mut self, url: impl Into<String>) -> Self {
        self.resolver_url = url.into();
        self
    }

    fn default_headers() -> HeaderMap {
        // 伪装成桌面浏览器，照抄接口网页端的请求头
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_UA));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://www.tikwm.com"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.tikwm.com/"));
        headers
    }

    /// 把分享链接解析成可下载的视频描述，单次请求，不做重试
    pub async fn resolve_video(&self, url: &str) -> Result<TikTokVideoData, ApiError> {
        let query = serde_urlencoded::to_string([
            ("url", url),
            ("count", "12"),
            ("cursor", "0"),
            ("web", "1"),
            ("hd", "1"),
        ])
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        let request_url = format!("{}?{}", self.resolver_url, query);
        debug!("请求解析接口: {}", request_url);

        let resp = self.inner.post(&request_url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            error!("解析接口返回非成功状态码: {}", status);
            return Err(ApiError::HttpStatus(status.as_u16()));
        }

        let body: TikTokVideoResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        if body.code != 0 {
            // 尽量从原始URL里提取视频id，方便上层提示
            return Err(ApiError::Api {
                code: body.code,
                message: if body.msg.is_empty() {
                    "Failed to download TikTok video".to_string()
                } else {
                    body.msg
                },
                video_id: UrlParser::extract_video_id(url),
            });
        }

        body.data
            .ok_or_else(|| ApiError::InvalidResponse("响应缺少 data 字段".to_string()))
    }

    /// 上传原始照片，multipart字段名与服务端约定一致
    pub async fn upload_photo(
        &self,
        base_url: &str,
        file_path: &Path,
        preset: &str,
    ) -> Result<PhotoResponse, ApiError> {
        let bytes = tokio::fs::read(file_path)
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("读取照片失败: {}", e)))?;

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo.jpg".to_string());

        let form = reqwest::multipart::Form::new()
            .part(
                "photo[original]",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            )
            .text("photo[preset]", preset.to_string());

        let upload_url = format!("{}/photos.json", base_url.trim_end_matches('/'));
        debug!("上传照片: {}", upload_url);

        let resp = self.inner.post(&upload_url).multipart(form).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status.as_u16()));
        }

        resp.json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// 查询照片处理状态，GET上传响应里的url字段
    pub async fn fetch_photo(&self, url: &str) -> Result<PhotoResponse, ApiError> {
        let resp = self.inner.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status.as_u16()));
        }

        resp.json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}
