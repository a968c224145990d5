use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::{debug, error, info, warn};

use super::{StoreChange, StoreError};
use crate::common::api::models::video::TikTokVideoData;
use crate::db::{VideoPatch, VideoRecord, VideosDb};
use crate::downloader::{DownloadEvent, DownloadManager};

pub const LOADING_TIMEOUT: Duration = Duration::from_secs(10);

/// 本地记录的内存投影，负责把下载事件同步写回数据库
/// 依赖显式注入，进程内只建一份，用Arc共享
pub struct VideosStore {
    db: VideosDb,
    manager: Arc<DownloadManager>,
    videos: RwLock<Vec<VideoRecord>>,
    is_loading: AtomicBool,
    last_error: RwLock<Option<String>>,
    notify: broadcast::Sender<StoreChange>,
}

impl VideosStore {
    pub fn new(db: VideosDb, manager: Arc<DownloadManager>) -> Arc<Self> {
        let (notify, _) = broadcast::channel(64);
        Arc::new(Self {
            db,
            manager,
            videos: RwLock::new(Vec::new()),
            is_loading: AtomicBool::new(false),
            last_error: RwLock::new(None),
            notify,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.notify.subscribe()
    }

    pub async fn videos(&self) -> Vec<VideoRecord> {
        self.videos.read().await.clone()
    }

    pub async fn get_video(&self, id: &str) -> Option<VideoRecord> {
        self.videos
            .read()
            .await
            .iter()
            .find(|v| v.id == id)
            .cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    async fn set_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }

    /// 从数据库加载全量记录，同一时间只允许一次，超时按失败处理
    pub async fn load_videos(&self) {
        self.load_videos_with_timeout(LOADING_TIMEOUT).await;
    }

    pub async fn load_videos_with_timeout(&self, timeout: Duration) {
        // 单飞守卫：已有加载在跑就跳过
        if self
            .is_loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("已有加载任务在执行，跳过本次加载");
            return;
        }

        *self.last_error.write().await = None;

        match tokio::time::timeout(timeout, self.db.get_videos()).await {
            Ok(Ok(records)) => {
                *self.videos.write().await = records;
                let _ = self.notify.send(StoreChange::Loaded);
            }
            Ok(Err(e)) => {
                error!("加载视频记录失败: {}", e);
                self.set_error(e.to_string()).await;
            }
            Err(_) => {
                error!("加载视频记录超时");
                self.set_error(StoreError::LoadTimeout.to_string()).await;
            }
        }

        self.is_loading.store(false, Ordering::SeqCst);
    }

    /// 落库并进入内存列表头部，然后后台启动下载，不阻塞调用方
    pub async fn save_video(
        self: &Arc<Self>,
        data: TikTokVideoData,
    ) -> Result<VideoRecord, StoreError> {
        let record = VideoRecord::from_resolved(&data);
        self.db.save_video(&record).await?;

        // 回读一次，保证内存里的就是落库后的形态
        let saved = self
            .db
            .get_video_by_id(&record.id)
            .await?
            .ok_or_else(|| StoreError::RecordNotFound(record.id.clone()))?;

        {
            let mut videos = self.videos.write().await;
            videos.retain(|v| v.id != saved.id);
            videos.insert(0, saved.clone());
        }
        let _ = self.notify.send(StoreChange::Added(saved.id.clone()));

        let manager = Arc::clone(&self.manager);
        let store = Arc::clone(self);
        let record_for_download = saved.clone();
        tokio::spawn(async move {
            store
                .update_video(&record_for_download.id, VideoPatch::downloading())
                .await;
            manager.start_download(&record_for_download).await;
        });

        Ok(saved)
    }

    /// 对已有记录手动触发下载（重试入口）
    pub async fn start_video_download(self: &Arc<Self>, id: &str) -> Result<(), StoreError> {
        let record = self
            .get_video(id)
            .await
            .ok_or_else(|| StoreError::RecordNotFound(id.to_string()))?;

        self.update_video(id, VideoPatch::downloading()).await;
        self.manager.start_download(&record).await;
        Ok(())
    }

    /// 先写库再改内存；落库失败只记日志和错误字段，不回滚内存
    pub async fn update_video(&self, id: &str, patch: VideoPatch) {
        if let Err(e) = patch.validate() {
            warn!("拒绝无效的记录补丁: {}", e);
            self.set_error(e.to_string()).await;
            return;
        }

        let db_result = self.db.update_video(id, &patch).await;

        let mut touched = false;
        {
            let mut videos = self.videos.write().await;
            if let Some(record) = videos.iter_mut().find(|v| v.id == id) {
                patch.apply_to(record);
                touched = true;
            }
        }
        if touched {
            let _ = self.notify.send(StoreChange::Updated(id.to_string()));
        }

        if let Err(e) = db_result {
            // 接受内存和库短暂不一致，等下一次成功写入追平
            error!("记录 {} 落库失败: {}", id, e);
            self.set_error(e.to_string()).await;
        }
    }

    /// 删除记录并取消在途下载，本地文件一并清掉
    pub async fn delete_video(&self, id: &str) -> Result<(), StoreError> {
        self.manager.cancel(id).await;
        self.manager.remove_local_file(id).await;
        self.db.delete_video(id).await?;

        {
            let mut videos = self.videos.write().await;
            videos.retain(|v| v.id != id);
        }
        let _ = self.notify.send(StoreChange::Deleted(id.to_string()));
        info!("已删除视频记录: {}", id);
        Ok(())
    }

    /// 消费下载事件并同步到库和内存，未知id的事件静默丢弃
    pub async fn run_reconciler(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<DownloadEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                DownloadEvent::Progress { id, percent } => {
                    self.update_video(&id, VideoPatch::progress(percent)).await;
                }
                DownloadEvent::Completed { id, local_path } => {
                    self.update_video(
                        &id,
                        VideoPatch::completed(local_path.to_string_lossy().into_owned()),
                    )
                    .await;
                }
                DownloadEvent::Failed { id, error } => {
                    error!("视频 {} 下载失败: {}", id, error);
                    self.update_video(&id, VideoPatch::failed()).await;
                    self.set_error(error).await;
                }
            }
        }
        debug!("下载事件通道关闭，对账循环退出");
    }
}
