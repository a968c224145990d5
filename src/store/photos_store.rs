use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, error, info};

use super::{StoreChange, StoreError};
use crate::common::api::models::photo::PhotoResponse;
use crate::db::PhotosDb;

/// 证件照任务列表的内存投影，轮询到的新状态经由这里写回库
pub struct PhotosStore {
    db: PhotosDb,
    photos: RwLock<Vec<PhotoResponse>>,
    is_loading: AtomicBool,
    last_error: RwLock<Option<String>>,
    notify: broadcast::Sender<StoreChange>,
}

impl PhotosStore {
    pub fn new(db: PhotosDb) -> Arc<Self> {
        let (notify, _) = broadcast::channel(64);
        Arc::new(Self {
            db,
            photos: RwLock::new(Vec::new()),
            is_loading: AtomicBool::new(false),
            last_error: RwLock::new(None),
            notify,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.notify.subscribe()
    }

    pub async fn photos(&self) -> Vec<PhotoResponse> {
        self.photos.read().await.clone()
    }

    pub async fn get_photo(&self, id: i64) -> Option<PhotoResponse> {
        self.photos
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub async fn load_photos(&self) {
        self.load_photos_with_timeout(super::videos_store::LOADING_TIMEOUT)
            .await;
    }

    pub async fn load_photos_with_timeout(&self, timeout: Duration) {
        if self
            .is_loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("已有加载任务在执行，跳过本次加载");
            return;
        }

        *self.last_error.write().await = None;

        match tokio::time::timeout(timeout, self.db.get_photos()).await {
            Ok(Ok(records)) => {
                *self.photos.write().await = records;
                let _ = self.notify.send(StoreChange::Loaded);
            }
            Ok(Err(e)) => {
                error!("加载照片记录失败: {}", e);
                *self.last_error.write().await = Some(e.to_string());
            }
            Err(_) => {
                error!("加载照片记录超时");
                *self.last_error.write().await = Some(StoreError::LoadTimeout.to_string());
            }
        }

        self.is_loading.store(false, Ordering::SeqCst);
    }

    /// 新上传的任务落库并插到列表头部
    pub async fn add_photo(&self, photo: PhotoResponse) -> Result<(), StoreError> {
        self.db.save_photo(&photo).await?;

        {
            let mut photos = self.photos.write().await;
            photos.retain(|p| p.id != photo.id);
            photos.insert(0, photo.clone());
        }
        let _ = self.notify.send(StoreChange::Added(photo.id.to_string()));
        Ok(())
    }

    /// 整行覆盖更新；列表里还没有这条记录时插到头部
    pub async fn update_photo(&self, photo: PhotoResponse) {
        let db_result = self.db.save_photo(&photo).await;

        {
            let mut photos = self.photos.write().await;
            match photos.iter_mut().find(|p| p.id == photo.id) {
                Some(existing) => *existing = photo.clone(),
                None => photos.insert(0, photo.clone()),
            }
        }
        let _ = self.notify.send(StoreChange::Updated(photo.id.to_string()));

        if let Err(e) = db_result {
            error!("照片记录 {} 落库失败: {}", photo.id, e);
            *self.last_error.write().await = Some(e.to_string());
        }
    }

    pub async fn delete_photo(&self, id: i64) -> Result<(), StoreError> {
        self.db.delete_photo(id).await?;

        {
            let mut photos = self.photos.write().await;
            photos.retain(|p| p.id != id);
        }
        let _ = self.notify.send(StoreChange::Deleted(id.to_string()));
        info!("已删除照片记录: {}", id);
        Ok(())
    }
}
