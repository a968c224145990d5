use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::photos_store::PhotosStore;
use crate::common::api::client::MediaApiClient;
use crate::common::api::models::photo::PhotoResponse;

pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// 轮询循环的句柄，持有方在离开页面时必须调用stop
pub struct PollHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl PollHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// 等轮询循环真正退出，测试和优雅关闭用
    pub async fn stopped(self) {
        self.cancel.cancel();
        let _ = self.join.await;
    }

    /// 不打断轮询，等它自己见到终态退出
    pub async fn wait(self) {
        let _ = self.join.await;
    }

    pub fn is_stopped(&self) -> bool {
        self.join.is_finished()
    }
}

/// 定时重查远端处理状态，见到终态或被stop就退出
pub struct StatusPoller;

impl StatusPoller {
    pub fn spawn(
        client: MediaApiClient,
        photo: PhotoResponse,
        store: Arc<PhotosStore>,
    ) -> PollHandle {
        Self::spawn_with_interval(client, photo, store, POLL_INTERVAL)
    }

    pub fn spawn_with_interval(
        client: MediaApiClient,
        photo: PhotoResponse,
        store: Arc<PhotosStore>,
        interval: Duration,
    ) -> PollHandle {
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();

        let join = tokio::spawn(async move {
            let mut current = photo;

            while current.is_processing() {
                tokio::select! {
                    _ = loop_cancel.cancelled() => {
                        debug!("照片 {} 的状态轮询被停止", current.id);
                        return;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }

                match client.fetch_photo(&current.url).await {
                    Ok(updated) => {
                        if updated.status != current.status {
                            info!("照片 {} 状态变更: {} -> {}", updated.id, current.status, updated.status);
                            store.update_photo(updated.clone()).await;
                        }
                        current = updated;
                    }
                    Err(e) => {
                        // 查询失败保持原状态，下一轮再试
                        warn!("查询照片 {} 状态失败: {}", current.id, e);
                    }
                }
            }

            debug!("照片 {} 已到终态 {}，轮询结束", current.id, current.status);
        });

        PollHandle { cancel, join }
    }
}
