use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::Connection;

use super::error::DbError;
use crate::common::api::client::RESOLVER_HOST;
use crate::common::api::models::video::TikTokVideoData;

/// 记录状态机：pending -> downloading -> downloaded | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Downloading,
    Downloaded,
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Downloading => "downloading",
            RecordStatus::Downloaded => "downloaded",
            RecordStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RecordStatus::Pending),
            "downloading" => Some(RecordStatus::Downloading),
            "downloaded" => Some(RecordStatus::Downloaded),
            "failed" => Some(RecordStatus::Failed),
            _ => None,
        }
    }
}

/// 一条已解析的视频记录，每个外部id只存一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub cover: String,
    pub duration: i64,
    pub hdplay: String,
    pub hd_size: i64,
    pub play: String,
    pub size: i64,
    pub author_unique_id: String,
    pub author_nickname: String,
    pub author_avatar: String,
    /// 插入时写入，之后不再变
    pub created_at: String,
    pub status: RecordStatus,
    pub download_percentage: f64,
    /// 仅在 status = downloaded 时非空
    pub local_uri: Option<String>,
}

impl VideoRecord {
    /// 从解析接口的返回构造一条待下载记录
    pub fn from_resolved(data: &TikTokVideoData) -> Self {
        Self {
            id: data.id.clone(),
            title: data.title.clone(),
            cover: data.cover.clone(),
            duration: data.duration,
            hdplay: normalize_media_url(&data.hdplay),
            hd_size: data.hd_size,
            play: normalize_media_url(&data.play),
            size: data.size,
            author_unique_id: data.author.unique_id.clone(),
            author_nickname: data.author.nickname.clone(),
            author_avatar: data.author.avatar.clone(),
            created_at: Utc::now().to_rfc3339(),
            status: RecordStatus::Pending,
            download_percentage: 0.0,
            local_uri: None,
        }
    }

    pub fn download_url(&self, hd: bool) -> &str {
        if hd && !self.hdplay.is_empty() {
            &self.hdplay
        } else {
            &self.play
        }
    }
}

// 接口有时返回相对路径的直链，补上host
fn normalize_media_url(url: &str) -> String {
    if url.is_empty() || url.starts_with("http") {
        url.to_string()
    } else {
        format!("{}{}", RESOLVER_HOST, url.trim_start_matches('/'))
    }
}

/// 只列出允许被下载流程修改的字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoPatch {
    pub status: Option<RecordStatus>,
    pub download_percentage: Option<f64>,
    pub local_uri: Option<String>,
}

impl VideoPatch {
    pub fn progress(percent: f64) -> Self {
        Self {
            download_percentage: Some(percent),
            ..Default::default()
        }
    }

    pub fn downloading() -> Self {
        Self {
            status: Some(RecordStatus::Downloading),
            download_percentage: Some(0.0),
            ..Default::default()
        }
    }

    pub fn completed(local_uri: String) -> Self {
        Self {
            status: Some(RecordStatus::Downloaded),
            download_percentage: Some(100.0),
            local_uri: Some(local_uri),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: Some(RecordStatus::Failed),
            ..Default::default()
        }
    }

    /// 校验补丁没有破坏 local_uri <-> downloaded 的绑定关系
    pub fn validate(&self) -> Result<(), DbError> {
        if self.local_uri.is_some() && self.status != Some(RecordStatus::Downloaded) {
            return Err(DbError::InvalidPatch(
                "local_uri 只能和 downloaded 状态一起写入".to_string(),
            ));
        }
        if self.status == Some(RecordStatus::Downloaded) && self.local_uri.is_none() {
            return Err(DbError::InvalidPatch(
                "downloaded 状态必须携带 local_uri".to_string(),
            ));
        }
        Ok(())
    }

    pub fn apply_to(&self, record: &mut VideoRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(percent) = self.download_percentage {
            record.download_percentage = percent;
        }
        if let Some(local_uri) = &self.local_uri {
            record.local_uri = Some(local_uri.clone());
        }
    }
}

/// videos 表的增删改查
#[derive(Clone)]
pub struct VideosDb {
    conn: Connection,
}

impl VideosDb {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// 按id做upsert，重复解析同一个视频不会产生第二行
    pub async fn save_video(&self, record: &VideoRecord) -> Result<(), DbError> {
        let record = record.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO videos (
                        id, title, cover, duration, hdplay, hd_size, play, size,
                        author_unique_id, author_nickname, author_avatar,
                        created_at, status, download_percentage, local_uri
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                    params![
                        record.id,
                        record.title,
                        record.cover,
                        record.duration,
                        record.hdplay,
                        record.hd_size,
                        record.play,
                        record.size,
                        record.author_unique_id,
                        record.author_nickname,
                        record.author_avatar,
                        record.created_at,
                        record.status.as_str(),
                        record.download_percentage,
                        record.local_uri,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_videos(&self) -> Result<Vec<VideoRecord>, DbError> {
        let videos = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT * FROM videos ORDER BY created_at DESC")?;
                let rows = stmt.query_map([], map_video_row)?;
                let videos = rows.collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(videos)
            })
            .await?;
        Ok(videos)
    }

    pub async fn get_video_by_id(&self, id: &str) -> Result<Option<VideoRecord>, DbError> {
        let id = id.to_string();
        let video = self
            .conn
            .call(move |conn| {
                let video = conn
                    .query_row("SELECT * FROM videos WHERE id = ?1", params![id], |row| {
                        map_video_row(row)
                    })
                    .optional()?;
                Ok(video)
            })
            .await?;
        Ok(video)
    }

    pub async fn delete_video(&self, id: &str) -> Result<(), DbError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM videos WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// 部分更新，补丁里没有的字段保持原值
    pub async fn update_video(&self, id: &str, patch: &VideoPatch) -> Result<(), DbError> {
        patch.validate()?;

        let id = id.to_string();
        let status = patch.status.map(|s| s.as_str().to_string());
        let percent = patch.download_percentage;
        let local_uri = patch.local_uri.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE videos SET
                        status = COALESCE(?2, status),
                        download_percentage = COALESCE(?3, download_percentage),
                        local_uri = COALESCE(?4, local_uri)
                    WHERE id = ?1",
                    params![id, status, percent, local_uri],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn map_video_row(row: &Row) -> rusqlite::Result<VideoRecord> {
    let status: String = row.get("status")?;
    Ok(VideoRecord {
        id: row.get("id")?,
        title: row.get("title")?,
        cover: row.get("cover")?,
        duration: row.get("duration")?,
        hdplay: row.get("hdplay")?,
        hd_size: row.get("hd_size")?,
        play: row.get("play")?,
        size: row.get("size")?,
        author_unique_id: row.get("author_unique_id")?,
        author_nickname: row.get("author_nickname")?,
        author_avatar: row.get("author_avatar")?,
        created_at: row.get("created_at")?,
        // 未知状态按失败处理，不让坏数据卡住加载
        status: RecordStatus::parse(&status).unwrap_or(RecordStatus::Failed),
        download_percentage: row.get("download_percentage")?,
        local_uri: row.get("local_uri")?,
    })
}
