use std::path::PathBuf;

/// 下载管理器对外广播的事件，消费方负责节流
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// 每个底层进度tick触发一次，percent 0-100
    Progress { id: String, percent: f64 },
    /// 每次成功的下载只触发一次
    Completed { id: String, local_path: PathBuf },
    /// 每次失败的下载最多触发一次，触发前任务已从注册表移除
    Failed { id: String, error: String },
}

impl DownloadEvent {
    pub fn id(&self) -> &str {
        match self {
            DownloadEvent::Progress { id, .. } => id,
            DownloadEvent::Completed { id, .. } => id,
            DownloadEvent::Failed { id, .. } => id,
        }
    }
}
