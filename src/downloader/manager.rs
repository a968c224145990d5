use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::DownloadError;
use super::events::DownloadEvent;
use super::task::TaskHandle;
use crate::db::VideoRecord;

const DOWNLOAD_UA: &str = "Mozilla/5.0";
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// 每个视频id最多一个在途传输，不同id之间不限并发
/// 所有状态变化通过事件通道上报，由store侧负责落库
pub struct DownloadManager {
    client: Client,
    download_dir: PathBuf,
    prefer_hd: bool,
    tasks: Arc<DashMap<String, TaskHandle>>,
    events: mpsc::UnboundedSender<DownloadEvent>,
}

impl DownloadManager {
    pub fn new(
        download_dir: impl AsRef<Path>,
        events: mpsc::UnboundedSender<DownloadEvent>,
    ) -> Self {
        Self {
            client: Client::new(),
            download_dir: download_dir.as_ref().to_path_buf(),
            prefer_hd: false,
            tasks: Arc::new(DashMap::new()),
            events,
        }
    }

    pub fn with_prefer_hd(mut self, prefer_hd: bool) -> Self {
        self.prefer_hd = prefer_hd;
        self
    }

    /// 视频落盘路径固定为 <下载目录>/<id>.mp4
    pub fn video_file_path(&self, id: &str) -> PathBuf {
        self.download_dir.join(format!("{}.mp4", id))
    }

    pub async fn is_downloaded(&self, id: &str) -> bool {
        tokio::fs::try_exists(self.video_file_path(id))
            .await
            .unwrap_or(false)
    }

    pub fn has_task(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// 启动一次下载，出错不抛给调用方，一律走 Failed 事件
    pub async fn start_download(&self, record: &VideoRecord) {
        let id = record.id.clone();

        // 同一个id已有在途任务时直接忽略
        if self.tasks.contains_key(&id) {
            debug!("视频 {} 已在下载中，忽略重复请求", id);
            return;
        }

        // 文件已经在磁盘上，不发网络请求，直接走完成路径
        let output_path = self.video_file_path(&id);
        if self.is_downloaded(&id).await {
            info!("视频 {} 的文件已存在，跳过下载", id);
            let _ = self.events.send(DownloadEvent::Progress {
                id: id.clone(),
                percent: 100.0,
            });
            let _ = self.events.send(DownloadEvent::Completed {
                id,
                local_path: output_path,
            });
            return;
        }

        let url = record.download_url(self.prefer_hd).to_string();
        if url.is_empty() {
            warn!("视频 {} 没有可用的下载地址", id);
            let _ = self.events.send(DownloadEvent::Failed {
                id: id.clone(),
                error: DownloadError::NoDownloadUrl(id).to_string(),
            });
            return;
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.download_dir).await {
            error!("创建下载目录失败: {}", e);
            let _ = self.events.send(DownloadEvent::Failed {
                id,
                error: DownloadError::Io(e).to_string(),
            });
            return;
        }

        let paused = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        // 先注册句柄再spawn，期间没有挂起点，重复start不会产生第二个任务
        self.tasks
            .insert(id.clone(), TaskHandle::new(Arc::clone(&paused), cancel.clone()));

        let _ = self.events.send(DownloadEvent::Progress {
            id: id.clone(),
            percent: 0.0,
        });

        info!("开始下载任务: {}", id);

        let worker = Worker {
            client: self.client.clone(),
            tasks: Arc::clone(&self.tasks),
            events: self.events.clone(),
            id: id.clone(),
            url,
            output_path,
            expected_size: if self.prefer_hd {
                record.hd_size
            } else {
                record.size
            },
            paused,
            cancel,
        };

        let join = tokio::spawn(worker.run());
        if let Some(mut handle) = self.tasks.get_mut(&id) {
            handle.set_join(join);
        }
    }

    /// 暂停在途传输，句柄保留在注册表里
    pub fn pause(&self, id: &str) {
        if let Some(handle) = self.tasks.get(id) {
            handle.pause();
            info!("已暂停下载: {}", id);
        } else {
            debug!("暂停请求忽略，视频 {} 没有在途任务", id);
        }
    }

    /// 恢复传输，从同一条流继续写
    pub fn resume(&self, id: &str) {
        if let Some(handle) = self.tasks.get(id) {
            handle.resume();
            info!("已恢复下载: {}", id);
        } else {
            debug!("恢复请求忽略，视频 {} 没有在途任务", id);
        }
    }

    /// 取消在途传输并尽力清理半成品文件，清理失败只记日志
    pub async fn cancel(&self, id: &str) {
        let Some((_, mut handle)) = self.tasks.remove(id) else {
            debug!("取消请求忽略，视频 {} 没有在途任务", id);
            return;
        };

        handle.cancel();
        if let Some(join) = handle.take_join() {
            let _ = join.await;
        }
        info!("已取消下载: {}", id);

        self.remove_local_file(id).await;
    }

    /// 尽力删除id对应的本地文件，删除记录时也要清掉已下载的文件
    pub async fn remove_local_file(&self, id: &str) {
        remove_file_best_effort(&self.video_file_path(id)).await;
    }
}

async fn remove_file_best_effort(path: &Path) {
    match tokio::fs::try_exists(path).await {
        Ok(true) => {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!("清理本地文件失败 {}: {}", path.display(), e);
            }
        }
        Ok(false) => {}
        Err(e) => warn!("检查本地文件失败 {}: {}", path.display(), e),
    }
}

struct Worker {
    client: Client,
    tasks: Arc<DashMap<String, TaskHandle>>,
    events: mpsc::UnboundedSender<DownloadEvent>,
    id: String,
    url: String,
    output_path: PathBuf,
    expected_size: i64,
    paused: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        let result = self.transfer().await;

        // 被取消的任务不再上报任何事件，注册表清理由cancel负责
        if self.cancel.is_cancelled() {
            debug!("下载任务 {} 已被取消", self.id);
            return;
        }

        match result {
            Ok(()) => {
                self.tasks.remove(&self.id);
                info!("下载任务完成: {}", self.id);
                // 完成时强制进度到100
                let _ = self.events.send(DownloadEvent::Progress {
                    id: self.id.clone(),
                    percent: 100.0,
                });
                let _ = self.events.send(DownloadEvent::Completed {
                    id: self.id.clone(),
                    local_path: self.output_path.clone(),
                });
            }
            Err(DownloadError::Cancelled) => {}
            Err(e) => {
                // 先移除任务再上报错误
                self.tasks.remove(&self.id);
                // 半成品必须清掉，不然重试会被已存在文件短路成完成
                remove_file_best_effort(&self.output_path).await;
                error!("下载任务失败: {}, 错误: {}", self.id, e);
                let _ = self.events.send(DownloadEvent::Failed {
                    id: self.id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    async fn transfer(&self) -> Result<(), DownloadError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, DOWNLOAD_UA)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus(status.as_u16()));
        }

        // 优先用响应头里的大小，拿不到就退回解析接口给的元数据
        let total_size = response
            .content_length()
            .unwrap_or_else(|| self.expected_size.max(0) as u64);

        let mut file = tokio::fs::File::create(&self.output_path).await?;
        let mut stream = response.bytes_stream();

        let mut downloaded = 0u64;
        let mut last_percent = 0f64;

        loop {
            // 暂停时原地等待，流保持打开
            while self.paused.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(DownloadError::Cancelled),
                    _ = tokio::time::sleep(PAUSE_POLL_INTERVAL) => {}
                }
            }

            let chunk = tokio::select! {
                _ = self.cancel.cancelled() => return Err(DownloadError::Cancelled),
                next = stream.next() => match next {
                    Some(chunk) => chunk.map_err(|e| DownloadError::Stream(e.to_string()))?,
                    None => break,
                },
            };

            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if total_size > 0 {
                let percent = (downloaded as f64 / total_size as f64 * 100.0).min(100.0);
                // 单次下载内进度只增不减
                if percent > last_percent {
                    last_percent = percent;
                    // 已经不在注册表里的任务不再上报进度
                    if self.tasks.contains_key(&self.id) {
                        let _ = self.events.send(DownloadEvent::Progress {
                            id: self.id.clone(),
                            percent,
                        });
                    }
                }
            }
        }

        file.flush().await?;
        Ok(())
    }
}
