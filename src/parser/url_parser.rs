use lazy_static::lazy_static;
use regex::Regex;

use super::errors::ParseError;

lazy_static! {
    static ref TIKTOK_URL_PATTERNS: Vec<Regex> = vec![
        // vt.tiktok.com 短链接
        Regex::new(r"https?://vt\.tiktok\.com/[A-Za-z0-9]+/?").unwrap(),
        // vm.tiktok.com 短链接
        Regex::new(r"https?://vm\.tiktok\.com/[A-Za-z0-9]+/?").unwrap(),
        // 标准网页链接
        Regex::new(r"https?://(?:www\.)?tiktok\.com/@[A-Za-z0-9_.]+/video/\d+").unwrap(),
        // 移动端链接
        Regex::new(r"https?://m\.tiktok\.com/v/(\d+)\.html").unwrap(),
    ];
    static ref VIDEO_ID_PATTERN: Regex = Regex::new(r"/video/(\d+)").unwrap();
}

/// 通过校验的TikTok链接
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TikTokUrl {
    pub url: String,
    /// 能从URL中直接提取到的视频id（短链接没有）
    pub video_id: Option<String>,
}

pub struct UrlParser;

impl UrlParser {
    /// 在发起任何网络请求之前校验输入的URL形状
    pub fn validate(input: &str) -> Result<TikTokUrl, ParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseError::EmptyUrl);
        }

        if TIKTOK_URL_PATTERNS.iter().any(|p| p.is_match(input)) {
            Ok(TikTokUrl {
                url: input.to_string(),
                video_id: Self::extract_video_id(input),
            })
        } else {
            Err(ParseError::InvalidUrl)
        }
    }

    /// 从标准链接中提取视频id，用于给API错误打标
    pub fn extract_video_id(url: &str) -> Option<String> {
        VIDEO_ID_PATTERN
            .captures(url)
            .map(|caps| caps[1].to_string())
    }

    /// 在一段文本中寻找第一个TikTok链接（剪贴板粘贴场景）
    pub fn find_in_text(text: &str) -> Option<String> {
        for pattern in TIKTOK_URL_PATTERNS.iter() {
            if let Some(m) = pattern.find(text) {
                return Some(m.as_str().to_string());
            }
        }
        None
    }
}
