use std::path::Path;

use tokio_rusqlite::Connection;

pub mod error;
pub mod photos;
pub mod videos;

pub use error::DbError;
pub use photos::PhotosDb;
pub use videos::{RecordStatus, VideoPatch, VideoRecord, VideosDb};

const DATABASE_VERSION: i64 = 1;

const CREATE_VIDEOS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        cover TEXT NOT NULL,
        duration INTEGER NOT NULL,
        hdplay TEXT NOT NULL,
        hd_size INTEGER NOT NULL,
        play TEXT NOT NULL,
        size INTEGER NOT NULL,
        author_unique_id TEXT NOT NULL,
        author_nickname TEXT NOT NULL,
        author_avatar TEXT NOT NULL,
        created_at TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        download_percentage REAL NOT NULL DEFAULT 0,
        local_uri TEXT
    )";

const CREATE_PHOTOS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS photos (
        id INTEGER PRIMARY KEY,
        jobId TEXT NOT NULL,
        preset TEXT NOT NULL,
        createdAt TEXT NOT NULL,
        updatedAt TEXT NOT NULL,
        originalUrl TEXT NOT NULL,
        resultHdUrl TEXT,
        url TEXT NOT NULL,
        country TEXT,
        documentType TEXT,
        dimension TEXT,
        status TEXT NOT NULL
    )";

/// 本地记录库，打开时执行一次增量迁移
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    pub async fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;
        let db = Self { conn };
        db.migrate().await?;
        Ok(db)
    }

    pub async fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().await?;
        let db = Self { conn };
        db.migrate().await?;
        Ok(db)
    }

    // 只建缺失的表，版本号写在 user_version 里
    async fn migrate(&self) -> Result<(), DbError> {
        self.conn
            .call(|conn| {
                let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
                if version >= DATABASE_VERSION {
                    return Ok(());
                }

                if version == 0 {
                    conn.pragma_update(None, "journal_mode", "WAL")?;
                    conn.execute(CREATE_VIDEOS_TABLE, [])?;
                    conn.execute(CREATE_PHOTOS_TABLE, [])?;
                }

                conn.pragma_update(None, "user_version", &DATABASE_VERSION)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// 底层连接，给需要直接执行SQL的调用方
    pub fn connection(&self) -> Connection {
        self.conn.clone()
    }

    pub fn videos(&self) -> VideosDb {
        VideosDb::new(self.conn.clone())
    }

    pub fn photos(&self) -> PhotosDb {
        PhotosDb::new(self.conn.clone())
    }
}
