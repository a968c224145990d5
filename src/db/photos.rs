use rusqlite::{OptionalExtension, Row, params};
use tokio_rusqlite::Connection;

use super::error::DbError;
use crate::common::api::models::photo::PhotoResponse;

/// photos 表的增删改查，列名与服务端返回的字段保持一致
#[derive(Clone)]
pub struct PhotosDb {
    conn: Connection,
}

impl PhotosDb {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// 按id做upsert，轮询到的新状态直接整行覆盖
    pub async fn save_photo(&self, photo: &PhotoResponse) -> Result<(), DbError> {
        let photo = photo.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO photos (
                        id, jobId, preset, createdAt, updatedAt, originalUrl,
                        resultHdUrl, url, country, documentType, dimension, status
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        photo.id,
                        photo.job_id,
                        photo.preset,
                        photo.created_at,
                        photo.updated_at,
                        photo.original_url,
                        photo.result_hd_url,
                        photo.url,
                        photo.country,
                        photo.document_type,
                        photo.dimension,
                        photo.status,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_photos(&self) -> Result<Vec<PhotoResponse>, DbError> {
        let photos = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT * FROM photos ORDER BY createdAt DESC")?;
                let rows = stmt.query_map([], map_photo_row)?;
                let photos = rows.collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(photos)
            })
            .await?;
        Ok(photos)
    }

    pub async fn get_photo_by_id(&self, id: i64) -> Result<Option<PhotoResponse>, DbError> {
        let photo = self
            .conn
            .call(move |conn| {
                let photo = conn
                    .query_row("SELECT * FROM photos WHERE id = ?1", params![id], |row| {
                        map_photo_row(row)
                    })
                    .optional()?;
                Ok(photo)
            })
            .await?;
        Ok(photo)
    }

    pub async fn delete_photo(&self, id: i64) -> Result<(), DbError> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM photos WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn map_photo_row(row: &Row) -> rusqlite::Result<PhotoResponse> {
    Ok(PhotoResponse {
        id: row.get("id")?,
        job_id: row.get("jobId")?,
        preset: row.get("preset")?,
        created_at: row.get("createdAt")?,
        updated_at: row.get("updatedAt")?,
        original_url: row.get("originalUrl")?,
        result_hd_url: row.get("resultHdUrl")?,
        url: row.get("url")?,
        country: row.get("country")?,
        document_type: row.get("documentType")?,
        dimension: row.get("dimension")?,
        status: row.get("status")?,
    })
}
